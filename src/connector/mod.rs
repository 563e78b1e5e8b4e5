//! Connector contract and registry
//!
//! Defines the [`ConnectorContract`] every vendor/log-type variant
//! implements, the value types flowing through a poll cycle, and the
//! [`ConnectorRegistry`] that selects a variant by `(service, log_type)`.
//!
//! # Overview
//!
//! A variant is a static description of one vendor API:
//! - identity (`service`, `log_type`) and `endpoint`
//! - credential requirements (`required_auth_info`) and how they are applied
//! - how to encode a window plus pagination marker into a request
//! - how to parse a raw page and normalize each event into the canonical
//!   [`NormalizedEvent`] envelope
//!
//! Variants hold no per-instance mutable state; the engine supplies the
//! window, marker, and credentials on every call.

mod registry;
mod types;

pub use registry::ConnectorRegistry;
pub use types::{
    ConnectorIdentity, CursorStrategy, FetchWindow, LogBatch, NormalizedEvent, ParsedPage,
    RawEvent, RawResponse, RequestBody, RequestSpec,
};

use crate::auth::{AuthScheme, AuthSpec};
use crate::error::Result;
use crate::pagination::PaginationMarker;

/// Capability set implemented by each vendor + log-type variant
pub trait ConnectorContract: Send + Sync {
    /// Vendor identifier (e.g., "slack")
    fn service(&self) -> &'static str;

    /// Log type identifier within the vendor (e.g., "access")
    fn log_type(&self) -> &'static str;

    /// Resource path of the vendor API call, relative to `base_url`
    fn endpoint(&self) -> &str;

    /// Base URL the endpoint is resolved against
    fn base_url(&self) -> &str;

    /// Credential requirements, shared by every instance of this variant
    fn required_auth_info(&self) -> &AuthSpec;

    /// How validated credentials are attached to requests
    fn auth_scheme(&self) -> AuthScheme;

    /// Whether the cursor is an event timestamp or a vendor-issued token
    fn cursor_strategy(&self) -> CursorStrategy {
        CursorStrategy::Timestamp
    }

    /// Encode the fetch window and pagination marker into a request
    fn build_request(&self, window: &FetchWindow, marker: &PaginationMarker)
        -> Result<RequestSpec>;

    /// Split one raw page into events and the marker for the next page.
    ///
    /// Fails with [`crate::Error::ResponseFormat`] when the vendor's success
    /// indicator is absent or the shape is unexpected.
    fn parse_response(&self, response: &RawResponse) -> Result<ParsedPage>;

    /// Map a raw event into the canonical envelope.
    ///
    /// Must be total over every event `parse_response` can produce.
    fn normalize(&self, event: RawEvent) -> NormalizedEvent;
}

/// Join a base URL and an endpoint path with exactly one slash between them
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
