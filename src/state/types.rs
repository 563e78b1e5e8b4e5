//! State types for tracking poll progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::connector::ConnectorIdentity;
use crate::types::from_epoch_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position where the next cycle's window begins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cursor {
    /// Epoch seconds
    Timestamp(i64),
    /// Opaque vendor-issued token
    Token(String),
}

impl Cursor {
    /// Cursor at a point in time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::Timestamp(time.timestamp())
    }

    /// Epoch seconds, if this is a timestamp cursor
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Token(_) => None,
        }
    }

    /// Timestamp cursor as a datetime
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.as_timestamp().and_then(from_epoch_seconds)
    }

    /// Token, if this is a token cursor
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(t) => Some(t),
            Self::Timestamp(_) => None,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => write!(f, "{ts}"),
            Self::Token(t) => write!(f, "token:{t}"),
        }
    }
}

/// Persisted incremental cursor of one connector instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    /// Where the next window begins
    pub cursor: Cursor,
    /// When this state was committed
    pub updated_at: DateTime<Utc>,
}

impl PollState {
    /// Create a state committed now
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            updated_at: Utc::now(),
        }
    }
}

/// Result of a compare-and-put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The new state was written
    Committed,
    /// The stored state no longer matched the expected prior state
    Conflict,
}

/// Time-bounded single-flight grant for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Identity the lease covers
    pub identity: ConnectorIdentity,
    /// Holder token; releasing requires the matching token
    pub token: Uuid,
    /// When the lease lapses and may be taken over
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Check if the lease has lapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
