//! Meeting room provider contract.
//!
//! The provider is opaque to the coordinator: it is addressed only by a
//! room token and a display name, and its failures surface as a generic
//! connectivity problem. Audio/video transport lives entirely behind this
//! seam.

use common::types::RoomName;
use thiserror::Error;
use tracing::info;

/// Meeting room provider errors.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The room could not be joined (missing, expired, or unreachable).
    #[error("meeting room unavailable: {0}")]
    Unavailable(String),
}

/// Opaque collaborator rendering the actual call.
#[async_trait::async_trait]
pub trait MeetingRoomProvider: Send + Sync {
    /// Join the named room under the given display name.
    ///
    /// No contract is assumed beyond eventual UI rendering or a failure.
    async fn join(&self, room_name: &RoomName, display_name: &str) -> Result<(), RoomError>;
}

/// Provider that only records joins in the log.
///
/// Default for tests and for UI shells that render the room themselves and
/// need no side effect from the coordinator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRoomProvider;

#[async_trait::async_trait]
impl MeetingRoomProvider for TracingRoomProvider {
    async fn join(&self, room_name: &RoomName, display_name: &str) -> Result<(), RoomError> {
        info!(room_name = %room_name, display_name, "joining meeting room");
        Ok(())
    }
}
