//! Common types used throughout auditpull
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Timestamp Format
// ============================================================================

/// How a vendor expects window timestamps to be encoded in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Unix timestamp (seconds), as text
    #[default]
    EpochSeconds,
    /// Unix timestamp (milliseconds), as text
    EpochMillis,
    /// ISO 8601 / RFC 3339 datetime string
    Iso8601,
}

impl TimestampFormat {
    /// Encode a timestamp in this format
    pub fn format(self, at: DateTime<Utc>) -> String {
        match self {
            Self::EpochSeconds => at.timestamp().to_string(),
            Self::EpochMillis => at.timestamp_millis().to_string(),
            Self::Iso8601 => at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Convert epoch seconds into a UTC datetime, rejecting out-of-range values
pub fn from_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Read an epoch-seconds value that a vendor may send as a number or as text
pub fn epoch_seconds_value(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let post: reqwest::Method = Method::POST.into();
        assert_eq!(reqwest::Method::POST, post);
    }

    #[test]
    fn test_method_default() {
        assert_eq!(Method::default(), Method::GET);
    }

    #[test]
    fn test_timestamp_format() {
        let at = from_epoch_seconds(1_422_922_864).unwrap();
        assert_eq!(TimestampFormat::EpochSeconds.format(at), "1422922864");
        assert_eq!(TimestampFormat::EpochMillis.format(at), "1422922864000");
        assert_eq!(TimestampFormat::Iso8601.format(at), "2015-02-03T00:21:04Z");
    }

    #[test]
    fn test_timestamp_format_serde() {
        let fmt: TimestampFormat = serde_json::from_str("\"iso8601\"").unwrap();
        assert_eq!(fmt, TimestampFormat::Iso8601);
    }

    #[test]
    fn test_epoch_seconds_value() {
        assert_eq!(epoch_seconds_value(&json!(1392163200)), Some(1_392_163_200));
        assert_eq!(epoch_seconds_value(&json!("1392163200")), Some(1_392_163_200));
        assert_eq!(epoch_seconds_value(&json!("yesterday")), None);
        assert_eq!(epoch_seconds_value(&json!(null)), None);
    }
}
