//! HTTP transport module
//!
//! The transport collaborator that carries a [`RequestSpec`] to a vendor and
//! returns the raw response. It never retries: retry cadence belongs to the
//! external scheduler, and a failed call simply ends the cycle.
//!
//! # Features
//!
//! - **Status classification**: 429/5xx are retryable, other 4xx are not
//! - **Rate Limiting**: Per-host token bucket using governor
//! - **Timeouts**: Per-request timeout on the underlying client
//!
//! [`RequestSpec`]: crate::connector::RequestSpec

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpTransport, HttpTransportConfig};
pub use rate_limit::{HostRateLimiter, RateLimiter, RateLimiterConfig};
pub use transport::{classify_status, Transport};

#[cfg(test)]
mod tests;
