//! Coordinator configuration.
//!
//! Configuration is loaded from environment variables. Every value has a
//! sensible default; nothing here is secret.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default pending-call expiry in seconds. Zero disables expiry.
pub const DEFAULT_PENDING_TIMEOUT_SECONDS: u64 = 60;

/// Default coordinator mailbox buffer size.
pub const DEFAULT_MAILBOX_BUFFER: usize = 64;

/// Default UI event buffer size.
pub const DEFAULT_UI_EVENT_BUFFER: usize = 64;

/// Default display name used when joining meeting rooms.
pub const DEFAULT_DISPLAY_NAME: &str = "Teleclinic User";

/// Call coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name presented to the meeting room provider and carried in
    /// `call.started` when this party initiates.
    pub display_name: String,

    /// Pending-call expiry armed by the initiating party. Zero disables.
    pub pending_timeout_seconds: u64,

    /// Coordinator mailbox buffer size.
    pub mailbox_buffer: usize,

    /// UI event buffer size.
    pub ui_event_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let display_name = vars
            .get("CALL_DISPLAY_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let pending_timeout_seconds = parse_var(
            vars,
            "CALL_PENDING_TIMEOUT_SECONDS",
            DEFAULT_PENDING_TIMEOUT_SECONDS,
        )?;

        let mailbox_buffer = parse_var(vars, "CALL_MAILBOX_BUFFER", DEFAULT_MAILBOX_BUFFER)?;
        if mailbox_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "CALL_MAILBOX_BUFFER must be greater than zero".to_string(),
            ));
        }

        let ui_event_buffer = parse_var(vars, "CALL_UI_EVENT_BUFFER", DEFAULT_UI_EVENT_BUFFER)?;
        if ui_event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "CALL_UI_EVENT_BUFFER must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            display_name,
            pending_timeout_seconds,
            mailbox_buffer,
            ui_event_buffer,
        })
    }

    /// Pending expiry as a duration; `None` when disabled.
    #[must_use]
    pub fn pending_timeout(&self) -> Option<Duration> {
        (self.pending_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.pending_timeout_seconds))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            pending_timeout_seconds: DEFAULT_PENDING_TIMEOUT_SECONDS,
            mailbox_buffer: DEFAULT_MAILBOX_BUFFER,
            ui_event_buffer: DEFAULT_UI_EVENT_BUFFER,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but unparseable.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("defaults should load");

        assert_eq!(config.display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(
            config.pending_timeout_seconds,
            DEFAULT_PENDING_TIMEOUT_SECONDS
        );
        assert_eq!(config.mailbox_buffer, DEFAULT_MAILBOX_BUFFER);
        assert_eq!(config.ui_event_buffer, DEFAULT_UI_EVENT_BUFFER);
        assert_eq!(config.pending_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_custom_values() {
        let vars = HashMap::from([
            ("CALL_DISPLAY_NAME".to_string(), "Dr. Varga".to_string()),
            ("CALL_PENDING_TIMEOUT_SECONDS".to_string(), "30".to_string()),
            ("CALL_MAILBOX_BUFFER".to_string(), "128".to_string()),
            ("CALL_UI_EVENT_BUFFER".to_string(), "16".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("config should load");
        assert_eq!(config.display_name, "Dr. Varga");
        assert_eq!(config.pending_timeout_seconds, 30);
        assert_eq!(config.mailbox_buffer, 128);
        assert_eq!(config.ui_event_buffer, 16);
    }

    #[test]
    fn test_zero_timeout_disables_expiry() {
        let vars = HashMap::from([("CALL_PENDING_TIMEOUT_SECONDS".to_string(), "0".to_string())]);
        let config = Config::from_vars(&vars).expect("config should load");
        assert_eq!(config.pending_timeout(), None);
    }

    #[test]
    fn test_unparseable_value_rejected() {
        let vars = HashMap::from([(
            "CALL_PENDING_TIMEOUT_SECONDS".to_string(),
            "soon".to_string(),
        )]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(v)) if v.contains("soon")));
    }

    #[test]
    fn test_zero_buffers_rejected() {
        let vars = HashMap::from([("CALL_MAILBOX_BUFFER".to_string(), "0".to_string())]);
        assert!(Config::from_vars(&vars).is_err());

        let vars = HashMap::from([("CALL_UI_EVENT_BUFFER".to_string(), "0".to_string())]);
        assert!(Config::from_vars(&vars).is_err());
    }
}
