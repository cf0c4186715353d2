//! Coordinator actor, mailbox messages, and UI event stream.

mod actor;
mod messages;

pub use actor::CallCoordinatorHandle;
pub use messages::{CoordinatorMessage, CoordinatorState, UiEvent};
