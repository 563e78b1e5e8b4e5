//! Error types for auditpull
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Each error maps onto a [`FailureKind`], the coarse classification the
//! poll engine logs and the external scheduler acts on.

use serde::Serialize;
use thiserror::Error;

/// Whether a transport failure may succeed on the scheduler's next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Timeouts, connection failures, 429 and 5xx responses
    Retryable,
    /// 4xx responses (auth/permission rejections)
    NonRetryable,
}

/// Coarse failure classification of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials do not satisfy the variant's auth spec
    AuthValidation,
    /// Transient failure, retried by the scheduler's normal cadence
    Retryable,
    /// Vendor rejected the request
    NonRetryable,
    /// Vendor answered with an unexpected shape
    Malformed,
    /// Downstream sink did not acknowledge the batch
    SinkAck,
    /// Another worker holds the lease for this identity
    LeaseHeld,
    /// Poll state changed under us between read and commit
    StateConflict,
    /// Local configuration problem
    Configuration,
    /// Anything else (I/O, serialization, ...)
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AuthValidation => "auth_validation",
            Self::Retryable => "retryable",
            Self::NonRetryable => "non_retryable",
            Self::Malformed => "malformed",
            Self::SinkAck => "sink_ack",
            Self::LeaseHeld => "lease_held",
            Self::StateConflict => "state_conflict",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// The main error type for auditpull
#[derive(Error, Debug)]
#[allow(missing_docs)] // variant fields are described by the messages
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("No connector registered for {service}/{log_type}")]
    UnknownConnector { service: String, log_type: String },

    #[error("Connector {service}/{log_type} is already registered")]
    DuplicateConnector { service: String, log_type: String },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error(
        "Credential validation failed: missing fields [{}], invalid fields [{}]",
        missing_fields.join(", "),
        invalid_fields.join(", ")
    )]
    AuthValidation {
        missing_fields: Vec<String>,
        invalid_fields: Vec<String>,
    },

    #[error("Credential field '{field}' is not set")]
    MissingCredential { field: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Transport error ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        status: Option<u16>,
        message: String,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Poll cycle exceeded {timeout_ms}ms and was abandoned")]
    CycleTimeout { timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Unexpected response format: {message}")]
    ResponseFormat { message: String },

    // ============================================================================
    // Sink Errors
    // ============================================================================
    #[error("Sink did not acknowledge batch: {message}")]
    SinkAck { message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Lease for {identity} is held by another worker")]
    LeaseHeld { identity: String },

    #[error("Poll state for {identity} changed concurrently; commit rejected")]
    StateConflict { identity: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a retryable transport error
    pub fn retryable(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Retryable,
            status,
            message: message.into(),
        }
    }

    /// Create a non-retryable transport error
    pub fn non_retryable(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::NonRetryable,
            status,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a response format error
    pub fn response_format(message: impl Into<String>) -> Self {
        Self::ResponseFormat {
            message: message.into(),
        }
    }

    /// Create a sink acknowledgement error
    pub fn sink_ack(message: impl Into<String>) -> Self {
        Self::SinkAck {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Classify this error for logging and scheduling
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::AuthValidation { .. } | Error::MissingCredential { .. } => {
                FailureKind::AuthValidation
            }
            Error::Transport {
                kind: TransportErrorKind::Retryable,
                ..
            }
            | Error::Timeout { .. }
            | Error::CycleTimeout { .. } => FailureKind::Retryable,
            Error::Transport {
                kind: TransportErrorKind::NonRetryable,
                ..
            } => FailureKind::NonRetryable,
            Error::Http(e)
                if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() =>
            {
                FailureKind::Retryable
            }
            Error::Http(_) => FailureKind::NonRetryable,
            Error::ResponseFormat { .. } => FailureKind::Malformed,
            Error::SinkAck { .. } => FailureKind::SinkAck,
            Error::LeaseHeld { .. } => FailureKind::LeaseHeld,
            Error::StateConflict { .. } => FailureKind::StateConflict,
            Error::Config { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::UnknownConnector { .. }
            | Error::DuplicateConnector { .. }
            | Error::InvalidUrl(_) => FailureKind::Configuration,
            _ => FailureKind::Internal,
        }
    }

    /// Check if the scheduler's next tick may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Retryable
                | FailureKind::SinkAck
                | FailureKind::LeaseHeld
                | FailureKind::StateConflict
        )
    }
}

/// Result type alias for auditpull
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::AuthValidation {
            missing_fields: vec!["client_id".to_string()],
            invalid_fields: vec!["auth_token".to_string(), "secret".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Credential validation failed: missing fields [client_id], invalid fields [auth_token, secret]"
        );

        let err = Error::response_format("missing 'ok' key");
        assert_eq!(
            err.to_string(),
            "Unexpected response format: missing 'ok' key"
        );
    }

    #[test]
    fn test_failure_kind() {
        assert_eq!(
            Error::retryable(Some(503), "unavailable").kind(),
            FailureKind::Retryable
        );
        assert_eq!(
            Error::non_retryable(Some(403), "forbidden").kind(),
            FailureKind::NonRetryable
        );
        assert_eq!(
            Error::CycleTimeout { timeout_ms: 10 }.kind(),
            FailureKind::Retryable
        );
        assert_eq!(Error::response_format("x").kind(), FailureKind::Malformed);
        assert_eq!(Error::sink_ack("x").kind(), FailureKind::SinkAck);
        assert_eq!(
            Error::AuthValidation {
                missing_fields: vec![],
                invalid_fields: vec!["auth_token".to_string()],
            }
            .kind(),
            FailureKind::AuthValidation
        );
        assert_eq!(Error::config("x").kind(), FailureKind::Configuration);
        assert_eq!(Error::state("x").kind(), FailureKind::Internal);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::retryable(None, "timeout").is_retryable());
        assert!(Error::Timeout {
            operation: "sink emit".to_string(),
            timeout_ms: 1000
        }
        .is_retryable());
        assert!(Error::sink_ack("down").is_retryable());

        assert!(!Error::non_retryable(Some(401), "").is_retryable());
        assert!(!Error::response_format("").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::internal("script exhausted").is_retryable());
    }
}
