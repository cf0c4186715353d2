//! Identifier newtypes shared across Teleclinic call coordination components.
//!
//! `CallId` is assigned by the session store at creation time. The scheduling
//! identifiers (`AppointmentId`, `PatientId`, `DoctorId`) are opaque foreign
//! references owned by the scheduling domain; nothing here inspects them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a call session, assigned by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    /// Create a new random call ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque reference to an appointment in the scheduling domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub String);

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AppointmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque reference to a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientId(pub String);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PatientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque reference to a doctor record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoctorId(pub String);

impl fmt::Display for DoctorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DoctorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque token naming a meeting room.
///
/// Both parties must reference the identical value for the same call; the
/// session store's create response is the canonical source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomName(pub String);

impl RoomName {
    /// Generate a random room-name proposal.
    ///
    /// Proposals are advisory: the session store may replace them, and the
    /// store's echoed value supersedes the proposal everywhere.
    #[must_use]
    pub fn proposal() -> Self {
        Self(format!("consult-{}", Uuid::new_v4()))
    }

    /// Whether the token is empty (the store generates a name in that case).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RoomName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
