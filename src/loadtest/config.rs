//! TOML-based load test configuration.
//!
//! Defines typed structs for parsing the load test definition from a TOML
//! config file: runner settings, which journey each virtual user walks,
//! login credentials, gameplay parameters, and the log sink.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! virtual_users = 10
//! duration_secs = 60
//! timeout_ms = 5000
//! wait_min_ms = 1000
//! wait_max_ms = 3000
//!
//! [journey]
//! kind = "sequential"
//!
//! [gameplay]
//! mode = "TargetMode"
//! overs = 2
//! stake = 0
//! target_score = 14
//!
//! [logging]
//! file = "crimson_loadtest.log"
//! level = "info"
//! ```
//!
//! Note: The target server URL is NOT part of the config file. It is provided
//! on the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::loadtest::error::LoadTestError;

/// Top-level load test configuration parsed from a TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoadTestConfig {
    /// General runner settings.
    pub settings: Settings,
    /// Which journey the virtual users walk.
    #[serde(default)]
    pub journey: JourneySettings,
    /// Credentials for the login-only journey.
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Parameters sent when joining and scoring a match.
    #[serde(default)]
    pub gameplay: GameplaySettings,
    /// Persistent log sink.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// General runner settings controlling execution parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Number of concurrent virtual users to simulate.
    pub virtual_users: u32,
    /// Total test duration in seconds.
    pub duration_secs: u64,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Lower bound of the pause between two steps of one VU (ms).
    ///
    /// Defaults depend on the journey kind when omitted.
    #[serde(default)]
    pub wait_min_ms: Option<u64>,
    /// Upper bound of the pause between two steps of one VU (ms).
    #[serde(default)]
    pub wait_max_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            virtual_users: 10,
            duration_secs: 60,
            timeout_ms: default_timeout(),
            wait_min_ms: None,
            wait_max_ms: None,
        }
    }
}

fn default_timeout() -> u64 {
    5000
}

/// The journey a virtual user walks.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JourneyKind {
    /// Guest login, token validation, home, reward, join, score -- repeated.
    #[default]
    Sequential,
    /// Credentialed login only, no chaining.
    Login,
}

/// `[journey]` table.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JourneySettings {
    #[serde(default)]
    pub kind: JourneyKind,
}

/// Identifier/password pair used by the credentialed login step.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

/// Parameters of the gameplay join and score submission requests.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GameplaySettings {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_overs")]
    pub overs: u32,
    #[serde(default)]
    pub stake: u32,
    #[serde(default = "default_target_score")]
    pub target_score: u32,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            overs: default_overs(),
            stake: 0,
            target_score: default_target_score(),
        }
    }
}

fn default_mode() -> String {
    "TargetMode".to_string()
}

fn default_overs() -> u32 {
    2
}

fn default_target_score() -> u32 {
    14
}

/// `[logging]` table: where request/response records are persisted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path. Relative paths resolve against the working directory.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("crimson_loadtest.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoadTestConfig {
    /// Parse a TOML string into a validated [`LoadTestConfig`].
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or
    /// [`LoadTestError::ConfigValidation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it.
    ///
    /// The CLI uses this so that flags and environment variables can fill
    /// in credentials or the VU count before [`Self::validate`] runs.
    pub fn read(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate that the config is semantically correct.
    ///
    /// Checks:
    /// - At least one virtual user and a positive duration
    /// - `wait_min_ms <= wait_max_ms`
    /// - The login journey has credentials
    pub fn validate(&self) -> Result<(), LoadTestError> {
        if self.settings.virtual_users == 0 {
            return Err(LoadTestError::ConfigValidation {
                message: "settings.virtual_users must be greater than 0".to_string(),
            });
        }

        if self.settings.duration_secs == 0 {
            return Err(LoadTestError::ConfigValidation {
                message: "settings.duration_secs must be greater than 0".to_string(),
            });
        }

        let (min, max) = self.wait_range_ms();
        if min > max {
            return Err(LoadTestError::ConfigValidation {
                message: format!("wait_min_ms={min} is greater than wait_max_ms={max}"),
            });
        }

        if self.journey.kind == JourneyKind::Login && self.credentials.is_none() {
            return Err(LoadTestError::ConfigValidation {
                message: "journey kind \"login\" requires a [credentials] table".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the effective pause range between two steps, in milliseconds.
    ///
    /// Unset bounds fall back to the journey's default: 1-3s for the
    /// sequential journey, 1-2s for the login journey.
    pub fn wait_range_ms(&self) -> (u64, u64) {
        let (default_min, default_max) = match self.journey.kind {
            JourneyKind::Sequential => (1000, 3000),
            JourneyKind::Login => (1000, 2000),
        };
        (
            self.settings.wait_min_ms.unwrap_or(default_min),
            self.settings.wait_max_ms.unwrap_or(default_max),
        )
    }
}

impl Settings {
    /// Convert the `timeout_ms` field to a [`Duration`].
    pub fn timeout_as_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
