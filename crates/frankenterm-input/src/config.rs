#![forbid(unsafe_code)]

//! Input coordinator configuration.
//!
//! Defaults reproduce the browser terminal's historical behavior: a 50 ms
//! commit window, stale textarea text left alone on discard, no trace buffer.
//! Hosts may pass a JSON options object or environment overrides.

use core::time::Duration;

use serde::Deserialize;

use crate::error::InputError;
use crate::host::Platform;

/// Default debounce window between scheduling and committing a key.
pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_millis(50);

/// Longest accepted debounce window. Anything slower is perceptible lag.
pub const MAX_COMMIT_DELAY: Duration = Duration::from_secs(1);

pub const ENV_COMMIT_DELAY_MS: &str = "FRANKENTERM_INPUT_COMMIT_DELAY_MS";
pub const ENV_TRACE_CAPACITY: &str = "FRANKENTERM_INPUT_TRACE_CAPACITY";
pub const ENV_CLEAR_ON_DISCARD: &str = "FRANKENTERM_INPUT_CLEAR_ON_DISCARD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Platform flags used for third-level shift classification.
    pub platform: Platform,
    /// Debounce window for pending commits.
    pub commit_delay: Duration,
    /// Clear the surface's buffered text when a composition start discards an
    /// uncommitted key.
    pub clear_buffer_on_discard: bool,
    /// Capacity of the decision trace ring; `0` disables tracing.
    pub trace_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            commit_delay: DEFAULT_COMMIT_DELAY,
            clear_buffer_on_discard: false,
            trace_capacity: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputConfigJson {
    #[serde(default)]
    platform: Option<Platform>,
    #[serde(default)]
    commit_delay_ms: Option<u64>,
    #[serde(default)]
    clear_buffer_on_discard: Option<bool>,
    #[serde(default)]
    trace_capacity: Option<usize>,
}

impl InputConfig {
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    #[must_use]
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    /// Parse a host options object. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, InputError> {
        let json: InputConfigJson = serde_json::from_str(s)?;
        let defaults = Self::default();
        let config = Self {
            platform: json.platform.unwrap_or(defaults.platform),
            commit_delay: json
                .commit_delay_ms
                .map_or(defaults.commit_delay, Duration::from_millis),
            clear_buffer_on_discard: json
                .clear_buffer_on_discard
                .unwrap_or(defaults.clear_buffer_on_discard),
            trace_capacity: json.trace_capacity.unwrap_or(defaults.trace_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults with overrides from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from a custom environment lookup (for tests).
    ///
    /// Unparseable or out-of-range values are ignored, so the result always
    /// passes [`validate`](Self::validate).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ms) = env_parse::<u64, _>(&get_env, ENV_COMMIT_DELAY_MS) {
            let delay = Duration::from_millis(ms);
            if delay <= MAX_COMMIT_DELAY {
                config.commit_delay = delay;
            } else {
                tracing::warn!(
                    key = ENV_COMMIT_DELAY_MS,
                    ms,
                    "ignoring commit delay override above one second"
                );
            }
        }
        if let Some(capacity) = env_parse::<usize, _>(&get_env, ENV_TRACE_CAPACITY) {
            config.trace_capacity = capacity;
        }
        if let Some(value) = env_override_bool(&get_env, ENV_CLEAR_ON_DISCARD) {
            config.clear_buffer_on_discard = value;
        }
        config
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.commit_delay > MAX_COMMIT_DELAY {
            return Err(InputError::InvalidConfig("commit delay exceeds one second"));
        }
        Ok(())
    }
}

fn env_parse<T, F>(get_env: &F, key: &str) -> Option<T>
where
    T: core::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = get_env(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparseable input config override");
    }
    parsed
}

fn env_override_bool<F>(get_env: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_env(key)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
