//! Coordinator error types.
//!
//! Invalid-state and missing-handle conditions are checked locally and
//! short-circuit before any network call; connectivity and persistence
//! failures abort the in-flight transition with no local state mutation.
//! Internal details are logged, not exposed: [`CoordinatorError::user_message`]
//! is the only text intended for the UI.

use crate::channel::ChannelError;
use crate::store::StoreError;
use common::types::CallId;
use thiserror::Error;

/// Call coordinator error type.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The realtime channel was unreachable for an operation requiring it.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// A session store write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Operation attempted from a disallowed state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation referenced an unknown session id.
    #[error("call session not found: {0}")]
    NotFound(CallId),

    /// Coordinator task unavailable (shut down or mailbox closed).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Returns a client-safe message for UI notifications.
    ///
    /// Connectivity, persistence, and internal errors carry infrastructure
    /// detail that must not reach the patient-facing UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CoordinatorError::Connectivity(_) => {
                "Connection problem, please try again".to_string()
            }
            CoordinatorError::Persistence(_) => {
                "The call could not be saved, please try again".to_string()
            }
            CoordinatorError::InvalidState(msg) => msg.clone(),
            CoordinatorError::NotFound(_) => "This call no longer exists".to_string(),
            CoordinatorError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoordinatorError::NotFound(id),
            StoreError::InvalidTransition { from, to, .. } => CoordinatorError::InvalidState(
                format!("the call cannot move from {from} to {to}"),
            ),
            StoreError::Conflict(appointment) => CoordinatorError::InvalidState(format!(
                "appointment {appointment} already has an open call"
            )),
            StoreError::Unavailable(msg) => CoordinatorError::Persistence(msg),
        }
    }
}

impl From<ChannelError> for CoordinatorError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Disconnected(msg) => CoordinatorError::Connectivity(msg),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::CallStatus;

    #[test]
    fn test_store_error_mapping() {
        let id = CallId::new();
        assert!(matches!(
            CoordinatorError::from(StoreError::NotFound(id)),
            CoordinatorError::NotFound(got) if got == id
        ));
        assert!(matches!(
            CoordinatorError::from(StoreError::Unavailable("timeout".to_string())),
            CoordinatorError::Persistence(_)
        ));
        assert!(matches!(
            CoordinatorError::from(StoreError::InvalidTransition {
                id,
                from: CallStatus::Ended,
                to: CallStatus::Active,
            }),
            CoordinatorError::InvalidState(_)
        ));
        assert!(matches!(
            CoordinatorError::from(StoreError::Conflict("A123".into())),
            CoordinatorError::InvalidState(_)
        ));
    }

    #[test]
    fn test_channel_error_mapping() {
        let err = CoordinatorError::from(ChannelError::Disconnected("socket closed".to_string()));
        assert!(matches!(err, CoordinatorError::Connectivity(_)));
    }

    #[test]
    fn test_user_messages_hide_internal_details() {
        let err = CoordinatorError::Persistence("pg pool exhausted at 10.0.0.3".to_string());
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = CoordinatorError::Connectivity("ws://internal-broker:9090 refused".to_string());
        assert!(!err.user_message().contains("9090"));

        let err = CoordinatorError::Internal("mailbox closed".to_string());
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[test]
    fn test_invalid_state_message_passes_through() {
        let err = CoordinatorError::InvalidState("no pending call to accept".to_string());
        assert_eq!(err.user_message(), "no pending call to accept");
    }
}
