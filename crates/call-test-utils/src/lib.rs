//! Test utilities for the Teleclinic call coordinator.
//!
//! Provides mock collaborators with failure injection and a two-party
//! fixture wiring a doctor-side and a patient-side coordinator over a
//! shared store and channel.

pub mod fixtures;
pub mod mock_channel;
pub mod mock_store;

pub use fixtures::{next_ui_event, test_config, TwoParty};
pub use mock_channel::FlakyChannel;
pub use mock_store::MockSessionStore;
