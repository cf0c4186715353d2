//! Realtime channel protocol.
//!
//! Four events coordinate the two parties of a call. `call.started` is
//! self-describing: a listener that was offline at creation time can
//! reconstruct full context from that single event without a follow-up
//! store query. The remaining events carry only the session id.
//!
//! The channel may echo a publisher's own events back to it; the
//! coordinator applies events idempotently, so echoes and duplicate
//! delivery are harmless.
//!
//! Subscription lifecycle is scoped acquisition/release: an
//! [`EventSubscription`] is owned by the coordinator task and dropping it
//! is the deregistration point. No handler can fire against a torn-down
//! coordinator.

use common::types::{AppointmentId, CallId, DoctorId, PatientId, RoomName};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

pub mod local;

pub use local::LocalChannel;

/// Payload of `call.started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStarted {
    /// Store-assigned session id.
    pub id: CallId,
    /// Appointment the consultation belongs to.
    pub appointment_id: AppointmentId,
    /// Patient party.
    pub patient_id: PatientId,
    /// Doctor party.
    pub doctor_id: DoctorId,
    /// Canonical room token from the store's create response.
    pub room_name: RoomName,
    /// Display URL for the room.
    pub meeting_url: String,
    /// Initiating doctor's display name.
    pub doctor_name: String,
    /// Consultation reason shown to the receiving party.
    pub reason: String,
}

/// Events exchanged between the two parties of a call session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallEvent {
    /// A consultation call was created and is awaiting an answer.
    #[serde(rename = "call.started")]
    Started(CallStarted),

    /// The receiving party accepted.
    #[serde(rename = "call.accepted")]
    Accepted {
        /// Affected session.
        id: CallId,
    },

    /// The receiving party declined.
    #[serde(rename = "call.rejected")]
    Rejected {
        /// Affected session.
        id: CallId,
    },

    /// Either party ended the call.
    #[serde(rename = "call.ended")]
    Ended {
        /// Affected session.
        id: CallId,
    },
}

impl CallEvent {
    /// Session the event is scoped to.
    #[must_use]
    pub fn session_id(&self) -> CallId {
        match self {
            CallEvent::Started(started) => started.id,
            CallEvent::Accepted { id } | CallEvent::Rejected { id } | CallEvent::Ended { id } => {
                *id
            }
        }
    }

    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            CallEvent::Started(_) => "call.started",
            CallEvent::Accepted { .. } => "call.accepted",
            CallEvent::Rejected { .. } => "call.rejected",
            CallEvent::Ended { .. } => "call.ended",
        }
    }
}

/// Realtime channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel was unreachable at publish time.
    #[error("realtime channel disconnected: {0}")]
    Disconnected(String),
}

/// Addressed pub/sub between the two parties' coordinator instances.
#[async_trait::async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Deliver an event to the opposing party's active subscription.
    async fn publish(&self, event: CallEvent) -> Result<(), ChannelError>;

    /// Acquire a subscription covering all event kinds.
    fn subscribe(&self) -> EventSubscription;
}

/// Scoped subscription to all call events.
///
/// Dropping the subscription deregisters it.
#[derive(Debug)]
pub struct EventSubscription {
    rx: broadcast::Receiver<CallEvent>,
}

impl EventSubscription {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub fn new(rx: broadcast::Receiver<CallEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the channel is closed. A lagged subscription
    /// logs the number of skipped events and keeps receiving; the
    /// coordinator's idempotent event application tolerates the gap.
    pub async fn next(&mut self) -> Option<CallEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscription lagged, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn started_event() -> CallEvent {
        CallEvent::Started(CallStarted {
            id: CallId::new(),
            appointment_id: "A123".into(),
            patient_id: "P1".into(),
            doctor_id: "D1".into(),
            room_name: "R1".into(),
            meeting_url: "https://rooms.example/R1".to_string(),
            doctor_name: "Dr. Varga".to_string(),
            reason: "follow-up".to_string(),
        })
    }

    #[test]
    fn test_event_wire_tags() {
        let started = started_event();
        let json = serde_json::to_value(&started).unwrap();
        assert_eq!(json["event"], "call.started");
        // Self-describing payload: full context in one event.
        assert_eq!(json["room_name"], "R1");
        assert_eq!(json["doctor_name"], "Dr. Varga");

        let accepted = CallEvent::Accepted { id: CallId::new() };
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["event"], "call.accepted");
    }

    #[test]
    fn test_event_round_trip() {
        let event = started_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: CallEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_session_id_extraction() {
        let id = CallId::new();
        assert_eq!(CallEvent::Ended { id }.session_id(), id);
        assert_eq!(CallEvent::Rejected { id }.session_id(), id);
        assert_eq!(CallEvent::Accepted { id }.session_id(), id);
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(started_event().kind(), "call.started");
        assert_eq!(CallEvent::Ended { id: CallId::new() }.kind(), "call.ended");
    }
}
