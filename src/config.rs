//! Channel and registry configuration.
//!
//! Plain value structs with public fields. Invalid values are clamped by
//! `normalize()` rather than rejected. Environment overrides are applied
//! explicitly by the host, never implicitly at construction.
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `HANDOFF_CANCEL_POLL_INTERVAL_MS` | `u64` | `ChannelConfig::cancel_poll_interval` |
//! | `HANDOFF_MAX_PAYLOAD` | `usize` | `ChannelConfig::max_payload` |
//! | `HANDOFF_REFUSE_REGISTRATIONS` | `bool` | `RegistryConfig::refuse_registrations` |

use core::fmt;
use std::time::Duration;

/// Environment variable for the cancellation poll interval (milliseconds).
pub const ENV_CANCEL_POLL_INTERVAL_MS: &str = "HANDOFF_CANCEL_POLL_INTERVAL_MS";
/// Environment variable for the maximum payload length (bytes).
pub const ENV_MAX_PAYLOAD: &str = "HANDOFF_MAX_PAYLOAD";
/// Environment variable for refusing registrations.
pub const ENV_REFUSE_REGISTRATIONS: &str = "HANDOFF_REFUSE_REGISTRATIONS";

/// Default cancellation poll interval.
pub const DEFAULT_CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Default maximum payload length (64 KiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Configuration for a [`RendezvousChannel`](crate::RendezvousChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Upper bound on how long a parked participant sleeps between
    /// cancellation checkpoints. Bounds cancellation latency.
    pub cancel_poll_interval: Duration,
    /// Maximum accepted payload length in bytes.
    pub max_payload: usize,
}

impl ChannelConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.cancel_poll_interval.is_zero() {
            self.cancel_poll_interval = Duration::from_millis(1);
        }
        if self.max_payload == 0 {
            self.max_payload = DEFAULT_MAX_PAYLOAD;
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            cancel_poll_interval: DEFAULT_CANCEL_POLL_INTERVAL,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Configuration for a [`ChannelRegistry`](crate::ChannelRegistry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When set, every registration fails with `RegistrationDenied`.
    /// Fault-injection hook for exercising host startup failure paths.
    pub refuse_registrations: bool,
}

/// Error produced when an environment override cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but held an unparseable value.
    InvalidValue {
        /// The environment variable name.
        var: &'static str,
        /// The offending value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { var, value } => {
                write!(f, "invalid value {value:?} for {var}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Applies `HANDOFF_*` environment overrides to a [`ChannelConfig`].
///
/// Only variables present in the environment are applied. The result is
/// normalized afterwards.
pub fn apply_channel_env_overrides(config: &mut ChannelConfig) -> Result<(), ConfigError> {
    if let Some(ms) = parse_env::<u64>(ENV_CANCEL_POLL_INTERVAL_MS)? {
        config.cancel_poll_interval = Duration::from_millis(ms);
    }
    if let Some(max) = parse_env::<usize>(ENV_MAX_PAYLOAD)? {
        config.max_payload = max;
    }
    config.normalize();
    Ok(())
}

/// Applies `HANDOFF_*` environment overrides to a [`RegistryConfig`].
pub fn apply_registry_env_overrides(config: &mut RegistryConfig) -> Result<(), ConfigError> {
    if let Some(refuse) = parse_env::<bool>(ENV_REFUSE_REGISTRATIONS)? {
        config.refuse_registrations = refuse;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_are_sane() {
        let config = ChannelConfig::default();
        assert_eq!(config.cancel_poll_interval, DEFAULT_CANCEL_POLL_INTERVAL);
        assert_eq!(config.max_payload, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn normalize_clamps_zero_values() {
        let mut config = ChannelConfig {
            cancel_poll_interval: Duration::ZERO,
            max_payload: 0,
        };
        config.normalize();
        assert_eq!(config.cancel_poll_interval, Duration::from_millis(1));
        assert_eq!(config.max_payload, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn env_overrides_apply() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        std::env::set_var(ENV_CANCEL_POLL_INTERVAL_MS, "25");
        std::env::set_var(ENV_MAX_PAYLOAD, "128");

        let mut config = ChannelConfig::default();
        apply_channel_env_overrides(&mut config).expect("overrides failed");
        assert_eq!(config.cancel_poll_interval, Duration::from_millis(25));
        assert_eq!(config.max_payload, 128);

        std::env::remove_var(ENV_CANCEL_POLL_INTERVAL_MS);
        std::env::remove_var(ENV_MAX_PAYLOAD);
    }

    #[test]
    fn env_override_rejects_garbage() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        std::env::set_var(ENV_MAX_PAYLOAD, "not-a-number");

        let mut config = ChannelConfig::default();
        let err = apply_channel_env_overrides(&mut config).expect_err("must fail");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENV_MAX_PAYLOAD,
                value: "not-a-number".to_string(),
            }
        );

        std::env::remove_var(ENV_MAX_PAYLOAD);
    }

    #[test]
    fn registry_refuse_flag_from_env() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        std::env::set_var(ENV_REFUSE_REGISTRATIONS, "true");

        let mut config = RegistryConfig::default();
        apply_registry_env_overrides(&mut config).expect("overrides failed");
        assert!(config.refuse_registrations);

        std::env::remove_var(ENV_REFUSE_REGISTRATIONS);
    }
}
