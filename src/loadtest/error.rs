//! Error types for the load test driver.
//!
//! Defines [`LoadTestError`] for configuration errors and [`StepError`] for
//! transport and decoding errors encountered while a journey step runs.

/// Errors that occur during load test configuration parsing, validation, or file I/O.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed successfully but
    /// contains invalid values (e.g., zero virtual users, inverted wait range).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// The log file sink could not be created.
    #[error("Failed to open log file '{path}': {source}")]
    LogSink {
        source: std::io::Error,
        path: String,
    },
}

/// Errors raised while sending a single step request.
///
/// A non-200 status is NOT a `StepError`: the request went through and the
/// journey records it as a logical failure instead.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The request exceeded the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The response body could not be read or decoded.
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl StepError {
    /// Returns the error category as a static string for outcome classification.
    ///
    /// Categories: `"timeout"`, `"connection"`, `"decode"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
            Self::Decode { .. } => "decode",
        }
    }

    /// Classify a [`reqwest::Error`] into the appropriate [`StepError`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }
}
