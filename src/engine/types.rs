//! Engine types
//!
//! Cycle phases, engine configuration, and the report of a finished cycle.

use crate::connector::{ConnectorIdentity, FetchWindow};
use crate::state::Cursor;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Phase of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// No cycle running
    Idle,
    /// Checking credentials against the variant's auth spec
    ValidatingAuth,
    /// Requesting a page from the vendor
    Fetching,
    /// Deciding whether another page follows
    Paginating,
    /// Emitting the batch and persisting the new cursor
    Committing,
    /// Cycle aborted; poll state untouched
    Failed,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ValidatingAuth => "validating_auth",
            Self::Fetching => "fetching",
            Self::Paginating => "paginating",
            Self::Committing => "committing",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Soft failure of a cycle that still committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleWarning {
    /// The vendor kept reporting more pages after `max_pages`
    PaginationLimitExceeded {
        /// The configured bound that was hit
        max_pages: u32,
    },
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaginationLimitExceeded { max_pages } => {
                write!(f, "pagination limit of {max_pages} pages exceeded")
            }
        }
    }
}

/// Runtime configuration of the poll engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Window length used when an identity has no poll state yet
    pub default_lookback: Duration,
    /// Maximum pages fetched in one cycle
    pub max_pages: u32,
    /// Bound on each vendor request
    pub request_timeout: Duration,
    /// Bound on the sink acknowledgement
    pub sink_timeout: Duration,
    /// Bound on validating, fetching and emitting together
    pub cycle_timeout: Duration,
    /// How long a lease blocks other cycles of the same identity
    pub lease_ttl: Duration,
    /// Cycles `run_many` runs at once
    pub max_concurrent_cycles: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_lookback: Duration::from_secs(3600),
            max_pages: 100,
            request_timeout: Duration::from_secs(30),
            sink_timeout: Duration::from_secs(30),
            cycle_timeout: Duration::from_secs(300),
            lease_ttl: Duration::from_secs(600),
            max_concurrent_cycles: 4,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cold-start lookback
    #[must_use]
    pub fn with_default_lookback(mut self, lookback: Duration) -> Self {
        self.default_lookback = lookback;
        self
    }

    /// Set the page bound (at least 1)
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the sink acknowledgement timeout
    #[must_use]
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    /// Set the overall cycle timeout
    #[must_use]
    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    /// Set the lease TTL
    #[must_use]
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Set the concurrency of `run_many` (at least 1)
    #[must_use]
    pub fn with_max_concurrent_cycles(mut self, n: usize) -> Self {
        self.max_concurrent_cycles = n.max(1);
        self
    }
}

/// Summary of one committed cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Instance the cycle ran for
    pub identity: ConnectorIdentity,
    /// Window that was fetched
    pub window: FetchWindow,
    /// Phases entered, in order
    pub phases: Vec<CyclePhase>,
    /// Pages fully fetched and parsed
    pub pages_fetched: u32,
    /// Events in the acknowledged batch
    pub events_emitted: usize,
    /// Cursor the cycle started from
    pub previous_cursor: Option<Cursor>,
    /// Cursor written, if any
    pub committed_cursor: Option<Cursor>,
    /// Soft failures
    pub warnings: Vec<CycleWarning>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl CycleReport {
    /// Check if the cycle hit any soft failure
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
