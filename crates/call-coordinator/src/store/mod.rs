//! Session store contract.
//!
//! The store is the authoritative owner of [`CallSession`] records. The
//! coordinator treats it as proposal-in, canonical-out: a locally generated
//! room name is only a proposal, and the record returned by [`SessionStore::create`]
//! supersedes it. Every channel emission must be built from the returned
//! record, never from pre-create values.

use crate::session::{CallSession, CallStatus};
use common::types::{AppointmentId, CallId, DoctorId, PatientId, RoomName};
use thiserror::Error;

pub mod memory;

pub use memory::InMemorySessionStore;

/// Parameters for creating a new call session record.
#[derive(Debug, Clone)]
pub struct NewCallSession {
    /// Appointment the consultation belongs to.
    pub appointment_id: AppointmentId,
    /// Patient party.
    pub patient_id: PatientId,
    /// Doctor party.
    pub doctor_id: DoctorId,
    /// Advisory room name; the store may replace it.
    pub room_name_proposal: RoomName,
    /// Advisory display URL; the store may replace it.
    pub meeting_url_proposal: String,
}

/// Session store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given id.
    #[error("call session not found: {0}")]
    NotFound(CallId),

    /// The requested status change violates the transition graph.
    #[error("invalid transition for call {id}: {from} -> {to}")]
    InvalidTransition {
        /// Affected call.
        id: CallId,
        /// Status currently persisted.
        from: CallStatus,
        /// Status that was requested.
        to: CallStatus,
    },

    /// A non-terminal session already exists for the appointment.
    #[error("appointment {0} already has an open call session")]
    Conflict(AppointmentId),

    /// The store could not be reached or the write failed.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative persistence for call session records.
///
/// Implementations must uphold:
/// - at most one non-terminal session per appointment ([`StoreError::Conflict`]);
/// - `room_name` is write-once, fixed by the create response;
/// - `set_status` follows the transition graph, except that re-writing the
///   current status is an idempotent no-op returning the unchanged record.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new record with `status = pending`.
    ///
    /// The returned record is canonical and supersedes every proposal field.
    async fn create(&self, new: NewCallSession) -> Result<CallSession, StoreError>;

    /// Apply a status transition and return the updated record.
    async fn set_status(&self, id: CallId, status: CallStatus)
        -> Result<CallSession, StoreError>;
}
