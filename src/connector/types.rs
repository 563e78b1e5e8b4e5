//! Connector value types
//!
//! Identity, request/response envelopes, and the normalized event batch
//! produced by one poll cycle.

use crate::error::{Error, Result};
use crate::pagination::PaginationMarker;
use crate::state::Cursor;
use crate::types::{JsonObject, JsonValue, Method};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// Unique key of one configured integration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorIdentity {
    /// Vendor identifier (e.g., "slack")
    pub service: String,
    /// Log type within the vendor (e.g., "access")
    pub log_type: String,
    /// Operator-chosen instance name (e.g., the workspace)
    pub instance_id: String,
}

impl ConnectorIdentity {
    /// Create a new identity
    pub fn new(
        service: impl Into<String>,
        log_type: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            log_type: log_type.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Stable key used by state and credential stores
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConnectorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.log_type, self.instance_id)
    }
}

// ============================================================================
// Window
// ============================================================================

/// How a variant advances its cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorStrategy {
    /// Cursor is the newest observed event timestamp
    #[default]
    Timestamp,
    /// Cursor is an opaque token issued by the vendor
    Token,
}

/// The incremental range one poll cycle fetches: `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchWindow {
    /// Where the previous cycle stopped (or the lookback start on a cold start)
    pub start: Cursor,
    /// Wall-clock time the cycle started
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Create a window
    pub fn new(start: Cursor, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Start as a timestamp, if the cursor is one
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.as_datetime()
    }

    /// Start as a vendor token, if the cursor is one
    pub fn start_token(&self) -> Option<&str> {
        self.start.as_token()
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end.timestamp())
    }
}

// ============================================================================
// Request / Response
// ============================================================================

/// Body of an outgoing vendor request
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// `application/x-www-form-urlencoded` parameters
    Form(BTreeMap<String, String>),
    /// JSON document
    Json(JsonValue),
}

/// A fully described vendor request, before authentication is applied
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Query parameters
    pub query: BTreeMap<String, String>,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: RequestBody,
}

impl RequestSpec {
    /// Create a request with no parameters
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: RequestBody::None,
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a form parameter, switching the body to form encoding
    #[must_use]
    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.body {
            RequestBody::Form(params) => {
                params.insert(key.into(), value.into());
            }
            _ => {
                let mut params = BTreeMap::new();
                params.insert(key.into(), value.into());
                self.body = RequestBody::Form(params);
            }
        }
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Look up a parameter in the query string or form body
    pub fn param(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.query.get(key) {
            return Some(v.as_str());
        }
        match &self.body {
            RequestBody::Form(params) => params.get(key).map(String::as_str),
            _ => None,
        }
    }
}

/// A vendor response as received by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a 200 response with a JSON body
    pub fn ok_json(body: &JsonValue) -> Self {
        Self::new(200, body.to_string())
    }

    /// Parse the body as JSON, failing as a response format error
    pub fn json(&self) -> Result<JsonValue> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::response_format(format!("body is not valid JSON: {e}")))
    }
}

// ============================================================================
// Events
// ============================================================================

/// One vendor event as extracted from a page, before normalization
pub type RawEvent = JsonObject;

/// Result of parsing one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Events in vendor order
    pub events: Vec<RawEvent>,
    /// Continuation for the next request
    pub next: PaginationMarker,
    /// Vendor-issued resume token, for token-cursor variants
    pub resume_token: Option<String>,
}

impl ParsedPage {
    /// Create a page
    pub fn new(events: Vec<RawEvent>, next: PaginationMarker) -> Self {
        Self {
            events,
            next,
            resume_token: None,
        }
    }

    /// Attach a resume token
    #[must_use]
    pub fn with_resume_token(mut self, token: impl Into<String>) -> Self {
        self.resume_token = Some(token.into());
        self
    }
}

/// Canonical envelope wrapping one vendor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Vendor identifier
    pub service: String,
    /// Log type within the vendor
    pub log_type: String,
    /// Vendor event id, when the vendor exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<String>,
    /// When the vendor says the event happened, when it says so
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    /// Vendor fields, untouched
    pub payload: JsonValue,
}

/// Ordered events produced by one poll cycle, in fetch order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Which instance produced the batch
    pub identity: ConnectorIdentity,
    /// The window that was fetched
    pub window: FetchWindow,
    /// Ingestion time
    pub fetched_at: DateTime<Utc>,
    /// Events, page order then within-page order
    pub events: Vec<NormalizedEvent>,
}

impl LogBatch {
    /// Create an empty batch
    pub fn new(identity: ConnectorIdentity, window: FetchWindow) -> Self {
        Self {
            identity,
            window,
            fetched_at: Utc::now(),
            events: Vec::new(),
        }
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Newest event timestamp in the batch
    pub fn max_observed_at(&self) -> Option<DateTime<Utc>> {
        self.events.iter().filter_map(|e| e.observed_at).max()
    }
}
