//! Application-level configuration loading, including the match timing rules.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "VERSUS_BACK_CONFIG_PATH";

/// How long a pending challenge stays open before auto-cancelling.
const DEFAULT_CHALLENGE_TTL_SECS: u64 = 300;
/// How long a granted buzz may stay unanswered before it is forfeited.
const DEFAULT_BUZZ_TIMEOUT_SECS: u64 = 10;
/// Forfeits allowed per question before it advances unanswered.
const DEFAULT_MAX_FORFEITS: u8 = 2;
/// Maximum stored length of a single chat message, in characters.
const DEFAULT_CHAT_MAX_LEN: usize = 500;
/// Interval between storage health probes once a backend is connected.
const DEFAULT_STORAGE_POLL_SECS: u64 = 5;
/// Ceiling for the storage reconnection backoff delay.
const DEFAULT_STORAGE_RETRY_MAX_SECS: u64 = 10;
/// In-place reconnect attempts before rebuilding the backend from scratch.
const DEFAULT_STORAGE_RECONNECT_ATTEMPTS: u32 = 3;
/// Interval between sweeps for stalled challenges and buzzes.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Expiry window for an unaccepted challenge.
    pub challenge_ttl: Duration,
    /// Answer deadline after a granted buzz.
    pub buzz_timeout: Duration,
    /// Forfeits tolerated per question before it is scored as unanswered.
    pub max_forfeits: u8,
    /// Chat messages are truncated to this many characters.
    pub chat_max_len: usize,
    /// Delay between storage health probes.
    pub storage_poll_interval: Duration,
    /// Upper bound on the storage reconnection backoff.
    pub storage_retry_max: Duration,
    /// In-place reconnect attempts before the backend is rebuilt.
    pub storage_reconnect_attempts: u32,
    /// Delay between stalled-match sweeps.
    pub sweep_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), ?config, "loaded match engine config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::from_secs(DEFAULT_CHALLENGE_TTL_SECS),
            buzz_timeout: Duration::from_secs(DEFAULT_BUZZ_TIMEOUT_SECS),
            max_forfeits: DEFAULT_MAX_FORFEITS,
            chat_max_len: DEFAULT_CHAT_MAX_LEN,
            storage_poll_interval: Duration::from_secs(DEFAULT_STORAGE_POLL_SECS),
            storage_retry_max: Duration::from_secs(DEFAULT_STORAGE_RETRY_MAX_SECS),
            storage_reconnect_attempts: DEFAULT_STORAGE_RECONNECT_ATTEMPTS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    challenge_ttl_secs: Option<u64>,
    buzz_timeout_secs: Option<u64>,
    max_forfeits: Option<u8>,
    chat_max_len: Option<usize>,
    storage_poll_secs: Option<u64>,
    storage_retry_max_secs: Option<u64>,
    storage_reconnect_attempts: Option<u32>,
    sweep_interval_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            challenge_ttl: value
                .challenge_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.challenge_ttl),
            buzz_timeout: value
                .buzz_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.buzz_timeout),
            max_forfeits: value.max_forfeits.unwrap_or(defaults.max_forfeits),
            chat_max_len: value.chat_max_len.unwrap_or(defaults.chat_max_len),
            storage_poll_interval: value
                .storage_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.storage_poll_interval),
            storage_retry_max: value
                .storage_retry_max_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.storage_retry_max),
            storage_reconnect_attempts: value
                .storage_reconnect_attempts
                .unwrap_or(defaults.storage_reconnect_attempts),
            sweep_interval: value
                .sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_raw_config_keeps_defaults_for_missing_keys() {
        let raw: RawConfig = serde_json::from_str(r#"{"buzz_timeout_secs": 7}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.buzz_timeout, Duration::from_secs(7));
        assert_eq!(
            config.challenge_ttl,
            Duration::from_secs(DEFAULT_CHALLENGE_TTL_SECS)
        );
        assert_eq!(config.max_forfeits, DEFAULT_MAX_FORFEITS);
        assert_eq!(config.chat_max_len, DEFAULT_CHAT_MAX_LEN);
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
    }

    #[test]
    fn storage_knobs_are_configurable() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"storage_poll_secs": 2, "storage_reconnect_attempts": 5, "sweep_interval_secs": 60}"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.storage_poll_interval, Duration::from_secs(2));
        assert_eq!(config.storage_reconnect_attempts, 5);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(
            config.storage_retry_max,
            Duration::from_secs(DEFAULT_STORAGE_RETRY_MAX_SECS)
        );
    }
}
