//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve log level, log directory and channel capacity.
//! - Fall back to defaults for missing or invalid values.
//!
//! # Invariants
//! - Resolution never fails; rejected values are reported and replaced.
//! - `log_level` is always one of the levels `init_logging` accepts.
//! - `log_dir` is always absolute.

use crate::logging::{default_log_level, normalize_level};
use log::warn;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "NOTETAKER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTETAKER_LOG_DIR";
pub const ENV_CHANNEL_CAPACITY: &str = "NOTETAKER_CHANNEL_CAPACITY";

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const MAX_CHANNEL_CAPACITY: usize = 65_536;
const DEFAULT_LOG_DIR_NAME: &str = "notetaker-logs";

/// Settings shared by the sync session and logging bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    /// Capacity of the intake queue and backend change channels.
    pub channel_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// One environment value that was ignored in favor of its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRejection {
    pub key: &'static str,
    pub reason: &'static str,
}

impl ConfigRejection {
    /// Emits the `config_rejected` warning for this value.
    pub fn log(&self) {
        warn!(
            "event=config_rejected module=config key={} reason={}",
            self.key, self.reason
        );
    }
}

impl Display for ConfigRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ignoring {}: {}", self.key, self.reason)
    }
}

impl CoreConfig {
    /// Resolves configuration through an arbitrary key lookup, logging any
    /// rejected value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let (config, rejections) = Self::resolve(lookup);
        for rejection in &rejections {
            rejection.log();
        }
        config
    }

    /// Resolves configuration from process environment variables.
    ///
    /// Rejections are returned rather than logged so callers can report them
    /// once logging is up.
    pub fn resolve_env() -> (Self, Vec<ConfigRejection>) {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through a key lookup without logging.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<ConfigRejection>) {
        let mut config = Self::default();
        let mut rejections = Vec::new();

        if let Some(raw) = non_blank(lookup(ENV_LOG_LEVEL)) {
            match normalize_level(&raw) {
                Ok(level) => config.log_level = level.to_string(),
                Err(_) => rejections.push(ConfigRejection {
                    key: ENV_LOG_LEVEL,
                    reason: "unsupported_level",
                }),
            }
        }

        if let Some(raw) = non_blank(lookup(ENV_LOG_DIR)) {
            let path = PathBuf::from(&raw);
            if path.is_absolute() {
                config.log_dir = path;
            } else {
                rejections.push(ConfigRejection {
                    key: ENV_LOG_DIR,
                    reason: "not_absolute",
                });
            }
        }

        if let Some(raw) = non_blank(lookup(ENV_CHANNEL_CAPACITY)) {
            match raw.parse::<usize>() {
                Ok(value) => config.channel_capacity = value.clamp(1, MAX_CHANNEL_CAPACITY),
                Err(_) => rejections.push(ConfigRejection {
                    key: ENV_CHANNEL_CAPACITY,
                    reason: "not_a_number",
                }),
            }
        }

        (config, rejections)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
