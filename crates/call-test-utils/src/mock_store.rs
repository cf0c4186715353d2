//! Mock session store with canonicalization and failure injection.

use call_coordinator::session::{CallSession, CallStatus};
use call_coordinator::store::{InMemorySessionStore, NewCallSession, SessionStore, StoreError};
use common::types::{CallId, RoomName};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Mock [`SessionStore`] for unit and integration testing.
///
/// Delegates to the in-memory reference store and layers test behaviors on
/// top: room-name canonicalization (the store echoes a *different* room
/// name than proposed) and injectable write failures.
pub struct MockSessionStore {
    inner: InMemorySessionStore,
    /// When set, every create ignores the proposal and assigns
    /// `canonical-<n>` instead.
    rename_rooms: bool,
    rename_counter: AtomicU64,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    /// When set, `set_status` parks after counting until released. Lets a
    /// test publish channel events while a coordinator is mid-write.
    hold_updates: AtomicBool,
    update_gate: Notify,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl MockSessionStore {
    /// Store that echoes proposals unchanged (reference behavior).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            rename_rooms: false,
            rename_counter: AtomicU64::new(0),
            fail_creates: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            hold_updates: AtomicBool::new(false),
            update_gate: Notify::new(),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Store that replaces every room-name proposal with its own
    /// canonical `canonical-<n>` token.
    ///
    /// Use this to prove a coordinator adopts the echoed value rather than
    /// its pre-create proposal.
    #[must_use]
    pub fn renaming() -> Self {
        Self {
            rename_rooms: true,
            ..Self::new()
        }
    }

    /// Store whose creates fail with an unavailable error.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::new();
        store.fail_creates.store(true, Ordering::SeqCst);
        store
    }

    /// Toggle create failures.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Toggle status-update failures.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Park subsequent `set_status` calls until [`Self::release_updates`].
    ///
    /// The call is counted before parking, so a test can poll
    /// [`Self::status_calls`] to learn a writer is held at the gate.
    pub fn hold_updates(&self) {
        self.hold_updates.store(true, Ordering::SeqCst);
    }

    /// Release writers parked by [`Self::hold_updates`].
    pub fn release_updates(&self) {
        self.hold_updates.store(false, Ordering::SeqCst);
        self.update_gate.notify_waiters();
    }

    /// Number of create calls made.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of status-update calls made.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Fetch a copy of a record, if present.
    pub async fn get(&self, id: CallId) -> Option<CallSession> {
        self.inner.get(id).await
    }
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MockSessionStore {
    async fn create(&self, mut new: NewCallSession) -> Result<CallSession, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected create failure".to_string(),
            ));
        }
        if self.rename_rooms {
            let n = self.rename_counter.fetch_add(1, Ordering::SeqCst);
            new.room_name_proposal = RoomName(format!("canonical-{n}"));
            new.meeting_url_proposal = format!("https://rooms.test/canonical-{n}");
        }
        self.inner.create(new).await
    }

    async fn set_status(
        &self,
        id: CallId,
        status: CallStatus,
    ) -> Result<CallSession, StoreError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        loop {
            if !self.hold_updates.load(Ordering::SeqCst) {
                break;
            }
            let released = self.update_gate.notified();
            // Re-check after registering so a release between the load and
            // the registration cannot be missed.
            if !self.hold_updates.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected update failure".to_string(),
            ));
        }
        self.inner.set_status(id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> NewCallSession {
        NewCallSession {
            appointment_id: "A123".into(),
            patient_id: "P1".into(),
            doctor_id: "D1".into(),
            room_name_proposal: RoomName::proposal(),
            meeting_url_proposal: String::new(),
        }
    }

    #[tokio::test]
    async fn test_renaming_replaces_proposal() {
        let store = MockSessionStore::renaming();
        let session = store.create(new_session()).await.unwrap();
        assert_eq!(session.room_name.0, "canonical-0");
    }

    #[tokio::test]
    async fn test_update_gate_parks_until_released() {
        let store = std::sync::Arc::new(MockSessionStore::new());
        let session = store.create(new_session()).await.unwrap();

        store.hold_updates();
        let writer = {
            let store = store.clone();
            let id = session.id;
            tokio::spawn(async move { store.set_status(id, CallStatus::Ended).await })
        };

        // The call is counted before parking.
        while store.status_calls() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert!(!writer.is_finished());

        store.release_updates();
        let updated = writer.await.unwrap().unwrap();
        assert_eq!(updated.status, CallStatus::Ended);
    }

    #[tokio::test]
    async fn test_failure_injection_and_counters() {
        let store = MockSessionStore::failing();
        assert!(store.create(new_session()).await.is_err());
        assert_eq!(store.create_calls(), 1);

        store.set_fail_creates(false);
        let session = store.create(new_session()).await.unwrap();

        store.set_fail_updates(true);
        assert!(store.set_status(session.id, CallStatus::Ended).await.is_err());
        assert_eq!(store.status_calls(), 1);
    }
}
