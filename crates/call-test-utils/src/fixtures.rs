//! Two-party fixtures for coordinator integration tests.

use crate::{FlakyChannel, MockSessionStore};
use call_coordinator::config::Config;
use call_coordinator::coordinator::{CallCoordinatorHandle, UiEvent};
use call_coordinator::metrics::CallMetrics;
use call_coordinator::room::TracingRoomProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Coordinator config for tests: named party, pending expiry disabled
/// unless a test arms it explicitly.
#[must_use]
pub fn test_config(display_name: &str) -> Config {
    Config {
        display_name: display_name.to_string(),
        pending_timeout_seconds: 0,
        ..Config::default()
    }
}

/// Receive the next UI event, panicking if none arrives in time.
///
/// # Panics
///
/// Panics after one second without an event (assertion helper).
pub async fn next_ui_event(rx: &mut mpsc::Receiver<UiEvent>) -> UiEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a ui event")
        .expect("ui event stream closed")
}

/// A doctor-side and a patient-side coordinator wired over one shared
/// store and channel.
pub struct TwoParty {
    /// Shared authoritative store.
    pub store: Arc<MockSessionStore>,
    /// Shared realtime channel.
    pub channel: Arc<FlakyChannel>,
    /// Doctor-side coordinator metrics.
    pub doctor_metrics: Arc<CallMetrics>,
    /// Patient-side coordinator metrics.
    pub patient_metrics: Arc<CallMetrics>,
    /// Doctor-side coordinator.
    pub doctor: CallCoordinatorHandle,
    /// Doctor-side UI events.
    pub doctor_ui: mpsc::Receiver<UiEvent>,
    /// Patient-side coordinator.
    pub patient: CallCoordinatorHandle,
    /// Patient-side UI events.
    pub patient_ui: mpsc::Receiver<UiEvent>,
}

impl TwoParty {
    /// Spawn both parties with default test configs and a proposal-echoing
    /// store.
    #[must_use]
    pub fn spawn() -> Self {
        Self::spawn_with(
            Arc::new(MockSessionStore::new()),
            test_config("Dr. Varga"),
            test_config("Ms. Kiss"),
        )
    }

    /// Spawn both parties over the given store and per-party configs.
    #[must_use]
    pub fn spawn_with(
        store: Arc<MockSessionStore>,
        doctor_config: Config,
        patient_config: Config,
    ) -> Self {
        let channel = Arc::new(FlakyChannel::new());
        let doctor_metrics = CallMetrics::new();
        let patient_metrics = CallMetrics::new();

        let (doctor, doctor_ui) = CallCoordinatorHandle::spawn(
            doctor_config,
            store.clone(),
            channel.clone(),
            Arc::new(TracingRoomProvider),
            doctor_metrics.clone(),
        );
        let (patient, patient_ui) = CallCoordinatorHandle::spawn(
            patient_config,
            store.clone(),
            channel.clone(),
            Arc::new(TracingRoomProvider),
            patient_metrics.clone(),
        );

        Self {
            store,
            channel,
            doctor_metrics,
            patient_metrics,
            doctor,
            doctor_ui,
            patient,
            patient_ui,
        }
    }

    /// Stop both coordinator tasks.
    pub fn shutdown(&self) {
        self.doctor.shutdown();
        self.patient.shutdown();
    }
}
