//! In-memory session store.
//!
//! Reference implementation of [`SessionStore`] used by tests and local
//! development. Enforces the same invariants a production store would:
//! the status graph, idempotent same-status writes, and at most one
//! non-terminal session per appointment.

use super::{NewCallSession, SessionStore, StoreError};
use crate::session::{CallSession, CallStatus};
use chrono::Utc;
use common::types::{CallId, RoomName};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// In-memory [`SessionStore`] backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<CallId, CallSession>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of a record, if present.
    pub async fn get(&self, id: CallId) -> Option<CallSession> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, new: NewCallSession) -> Result<CallSession, StoreError> {
        let mut sessions = self.sessions.lock().await;

        // At most one non-terminal session per appointment.
        if let Some(open) = sessions
            .values()
            .find(|s| s.appointment_id == new.appointment_id && !s.status.is_terminal())
        {
            debug!(
                call_id = %open.id,
                appointment_id = %new.appointment_id,
                "create rejected: open session exists"
            );
            return Err(StoreError::Conflict(new.appointment_id));
        }

        // An empty proposal gets a store-generated canonical name.
        let room_name = if new.room_name_proposal.is_empty() {
            RoomName(format!("consult-{}", Uuid::new_v4()))
        } else {
            new.room_name_proposal
        };
        let meeting_url = if new.meeting_url_proposal.is_empty() {
            format!("https://rooms.teleclinic.example/{room_name}")
        } else {
            new.meeting_url_proposal
        };

        let now = Utc::now();
        let session = CallSession {
            id: CallId::new(),
            appointment_id: new.appointment_id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            room_name,
            meeting_url,
            status: CallStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sessions.insert(session.id, session.clone());
        debug!(call_id = %session.id, room_name = %session.room_name, "session created");
        Ok(session)
    }

    async fn set_status(
        &self,
        id: CallId,
        status: CallStatus,
    ) -> Result<CallSession, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        // Convergent idempotent write: re-writing the current status returns
        // the record unchanged.
        if session.status == status {
            return Ok(session.clone());
        }

        if !session.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id,
                from: session.status,
                to: status,
            });
        }

        session.status = status;
        session.updated_at = Utc::now();
        debug!(call_id = %id, status = %status, "session status updated");
        Ok(session.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_session(appointment: &str) -> NewCallSession {
        NewCallSession {
            appointment_id: appointment.into(),
            patient_id: "P1".into(),
            doctor_id: "D1".into(),
            room_name_proposal: RoomName::proposal(),
            meeting_url_proposal: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_pending_status() {
        let store = InMemorySessionStore::new();
        let session = store.create(new_session("A123")).await.unwrap();

        assert_eq!(session.status, CallStatus::Pending);
        assert!(!session.room_name.is_empty());
        assert_eq!(store.get(session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_create_generates_room_name_for_empty_proposal() {
        let store = InMemorySessionStore::new();
        let mut new = new_session("A123");
        new.room_name_proposal = RoomName(String::new());

        let session = store.create(new).await.unwrap();
        assert!(session.room_name.0.starts_with("consult-"));
        assert!(session.meeting_url.contains(&session.room_name.0));
    }

    #[tokio::test]
    async fn test_create_rejects_second_open_session_per_appointment() {
        let store = InMemorySessionStore::new();
        store.create(new_session("A123")).await.unwrap();

        let err = store.create(new_session("A123")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(a) if a.0 == "A123"));

        // A different appointment is unaffected.
        store.create(new_session("A456")).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_allowed_after_terminal() {
        let store = InMemorySessionStore::new();
        let first = store.create(new_session("A123")).await.unwrap();
        store
            .set_status(first.id, CallStatus::Ended)
            .await
            .unwrap();

        // Ended session no longer blocks a new attempt.
        store.create(new_session("A123")).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_status_follows_graph() {
        let store = InMemorySessionStore::new();
        let session = store.create(new_session("A123")).await.unwrap();

        let active = store
            .set_status(session.id, CallStatus::Active)
            .await
            .unwrap();
        assert_eq!(active.status, CallStatus::Active);
        assert_eq!(active.room_name, session.room_name);

        let err = store
            .set_status(session.id, CallStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: CallStatus::Active,
                to: CallStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_terminal_write_is_idempotent() {
        let store = InMemorySessionStore::new();
        let session = store.create(new_session("A123")).await.unwrap();

        let first = store
            .set_status(session.id, CallStatus::Ended)
            .await
            .unwrap();
        let second = store
            .set_status(session.id, CallStatus::Ended)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.status, CallStatus::Ended);
    }

    #[tokio::test]
    async fn test_terminal_states_absorb() {
        let store = InMemorySessionStore::new();
        let session = store.create(new_session("A123")).await.unwrap();
        store
            .set_status(session.id, CallStatus::Rejected)
            .await
            .unwrap();

        let err = store
            .set_status(session.id, CallStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_set_status_unknown_id() {
        let store = InMemorySessionStore::new();
        let id = CallId::new();
        let err = store.set_status(id, CallStatus::Ended).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(got) if got == id));
    }

    #[tokio::test]
    async fn test_room_name_never_changes_after_create() {
        let store = InMemorySessionStore::new();
        let session = store.create(new_session("A123")).await.unwrap();
        let room = session.room_name.clone();

        let active = store
            .set_status(session.id, CallStatus::Active)
            .await
            .unwrap();
        let ended = store
            .set_status(session.id, CallStatus::Ended)
            .await
            .unwrap();

        assert_eq!(active.room_name, room);
        assert_eq!(ended.room_name, room);
    }
}
