//! Message types for the coordinator mailbox and its UI event stream.
//!
//! Local operations enter the coordinator as strongly typed messages via
//! `tokio::sync::mpsc`; request-reply uses `tokio::sync::oneshot`. UI-facing
//! effects leave as [`UiEvent`] values so the enclosing UI shell consumes a
//! stream instead of being called back into.

use crate::errors::CoordinatorError;
use crate::session::{CallStatus, SessionHandle};
use common::types::{AppointmentId, CallId, DoctorId, PatientId, RoomName};
use tokio::sync::oneshot;

/// Messages sent to the coordinator task.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Initiate a consultation call for an appointment.
    Start {
        /// Appointment the consultation belongs to.
        appointment_id: AppointmentId,
        /// Patient party.
        patient_id: PatientId,
        /// Doctor party.
        doctor_id: DoctorId,
        /// Consultation reason shown to the receiving party.
        reason: String,
        /// Response channel for the adopted canonical handle or error.
        respond_to: oneshot::Sender<Result<SessionHandle, CoordinatorError>>,
    },

    /// Accept the pending incoming call.
    Accept {
        /// Response channel for the now-active handle or error.
        respond_to: oneshot::Sender<Result<SessionHandle, CoordinatorError>>,
    },

    /// Decline the pending incoming call.
    Reject {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), CoordinatorError>>,
    },

    /// End the current call (terminating, propagated, idempotent).
    End {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), CoordinatorError>>,
    },

    /// Hide the local call UI without ending the call. Never fails.
    Close {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<()>,
    },

    /// Restore the call UI from the cached handle. Purely local; `None`
    /// means there is no active call to rejoin.
    Rejoin {
        /// Response channel for the restored handle, if any.
        respond_to: oneshot::Sender<Option<SessionHandle>>,
    },

    /// Get the coordinator's current local state.
    GetState {
        /// Response channel for the state snapshot.
        respond_to: oneshot::Sender<CoordinatorState>,
    },
}

/// Snapshot of the coordinator's local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorState {
    /// The cached session handle, if a call exists locally.
    pub handle: Option<SessionHandle>,
    /// Whether the call UI is currently visible.
    pub ui_visible: bool,
}

/// UI-facing effects emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A remote party started a call towards this coordinator.
    IncomingCall {
        /// Session id.
        id: CallId,
        /// Canonical room token.
        room_name: RoomName,
        /// Initiating doctor's display name.
        doctor_name: String,
        /// Consultation reason.
        reason: String,
    },

    /// This coordinator started a call and is waiting for an answer.
    OutgoingCall {
        /// Session id.
        id: CallId,
        /// Canonical room token.
        room_name: RoomName,
    },

    /// The call became active; the meeting UI should be shown.
    MeetingJoined {
        /// Session id.
        id: CallId,
        /// Canonical room token.
        room_name: RoomName,
        /// Display URL for the room.
        meeting_url: String,
    },

    /// The local call UI was hidden (`close()`); the call itself continues.
    MeetingHidden,

    /// The call UI was restored from the cached handle (`rejoin()`).
    CallRestored {
        /// Session id.
        id: CallId,
        /// Canonical room token.
        room_name: RoomName,
        /// Display URL for the room.
        meeting_url: String,
        /// Cached status at restore time.
        status: CallStatus,
    },

    /// The call was declined.
    CallRejected {
        /// Session id.
        id: CallId,
    },

    /// The call ended.
    CallEnded {
        /// Session id.
        id: CallId,
    },

    /// The pending call expired without an answer.
    CallTimedOut {
        /// Session id.
        id: CallId,
    },

    /// A failure the user should see, as client-safe text.
    CallError {
        /// Client-safe message.
        message: String,
    },
}
