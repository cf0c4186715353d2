//! Call session records and the status transition graph.
//!
//! The status graph is the single source of truth for lifecycle
//! transitions:
//!
//! ```text
//! pending ──> active ──> ended
//!    │                     ^
//!    ├──> rejected         │
//!    └─────────────────────┘
//! ```
//!
//! `ended` and `rejected` are absorbing: once entered they are never left.
//! Writing the status a record already has is a convergent no-op, which is
//! what makes concurrent terminal writes from both parties safe without
//! optimistic locking.

use chrono::{DateTime, Utc};
use common::types::{AppointmentId, CallId, DoctorId, PatientId, RoomName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Created, waiting for the remote party to accept or reject.
    Pending,
    /// Both parties agreed; the meeting room is live.
    Active,
    /// The remote party declined (absorbing).
    Rejected,
    /// The call was ended by either party (absorbing).
    Ended,
}

impl CallStatus {
    /// Whether this status is absorbing.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Rejected | CallStatus::Ended)
    }

    /// Whether the transition `self -> next` follows the status graph.
    ///
    /// Re-writing the current status is not a transition; callers that want
    /// idempotent same-status writes handle that case before consulting the
    /// graph.
    #[must_use]
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        match self {
            CallStatus::Pending => matches!(
                next,
                CallStatus::Active | CallStatus::Rejected | CallStatus::Ended
            ),
            CallStatus::Active => matches!(next, CallStatus::Ended),
            CallStatus::Rejected | CallStatus::Ended => false,
        }
    }

    /// Status as its wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Active => "active",
            CallStatus::Rejected => "rejected",
            CallStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one video-consultation attempt.
///
/// Owned by the session store; both coordinators hold copies. `room_name`
/// is write-once: assigned by the store's create response and never
/// reassigned for the life of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    /// Store-assigned unique identifier.
    pub id: CallId,
    /// Appointment this consultation belongs to.
    pub appointment_id: AppointmentId,
    /// Patient party.
    pub patient_id: PatientId,
    /// Doctor party.
    pub doctor_id: DoctorId,
    /// Canonical meeting room token (write-once).
    pub room_name: RoomName,
    /// Display URL for the room; accompanying metadata, not authoritative.
    pub meeting_url: String,
    /// Current lifecycle status.
    pub status: CallStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status-change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Client-local cache of the one call this coordinator is involved in.
///
/// Deliberately a single optional value rather than independent flags, so
/// impossible combinations (a room name with no id) cannot be represented.
/// `close()` retains the handle; only ending or rejection clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Store-assigned call identifier.
    pub id: CallId,
    /// Canonical room token adopted from the store's create response.
    pub room_name: RoomName,
    /// Last locally observed status.
    pub status: CallStatus,
}

impl SessionHandle {
    /// Build a handle from a canonical store record.
    #[must_use]
    pub fn from_session(session: &CallSession) -> Self {
        Self {
            id: session.id,
            room_name: session.room_name.clone(),
            status: session.status,
        }
    }

    /// Whether the cached status is absorbing.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ALL: [CallStatus; 4] = [
        CallStatus::Pending,
        CallStatus::Active,
        CallStatus::Rejected,
        CallStatus::Ended,
    ];

    #[test]
    fn test_pending_fans_out() {
        assert!(CallStatus::Pending.can_transition_to(CallStatus::Active));
        assert!(CallStatus::Pending.can_transition_to(CallStatus::Rejected));
        assert!(CallStatus::Pending.can_transition_to(CallStatus::Ended));
    }

    #[test]
    fn test_active_only_ends() {
        assert!(CallStatus::Active.can_transition_to(CallStatus::Ended));
        assert!(!CallStatus::Active.can_transition_to(CallStatus::Pending));
        assert!(!CallStatus::Active.can_transition_to(CallStatus::Rejected));
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [CallStatus::Rejected, CallStatus::Ended] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} must not transition to {next}"
                );
            }
        }
    }

    #[test]
    fn test_active_unreachable_from_terminal() {
        assert!(!CallStatus::Rejected.can_transition_to(CallStatus::Active));
        assert!(!CallStatus::Ended.can_transition_to(CallStatus::Active));
    }

    #[test]
    fn test_no_state_reentry() {
        // The graph never re-enters a state once left: pending is a source,
        // and no status can transition back to itself.
        for status in ALL {
            assert!(!status.can_transition_to(CallStatus::Pending));
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&CallStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: CallStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(back, CallStatus::Ended);
    }

    #[test]
    fn test_handle_mirrors_session() {
        let session = CallSession {
            id: CallId::new(),
            appointment_id: "A123".into(),
            patient_id: "P1".into(),
            doctor_id: "D1".into(),
            room_name: "R1".into(),
            meeting_url: "https://rooms.example/R1".to_string(),
            status: CallStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let handle = SessionHandle::from_session(&session);
        assert_eq!(handle.id, session.id);
        assert_eq!(handle.room_name, session.room_name);
        assert_eq!(handle.status, CallStatus::Pending);
        assert!(!handle.is_terminal());
    }
}
