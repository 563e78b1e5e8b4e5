//! Transport contract and status classification

use crate::connector::{RawResponse, RequestSpec};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Carries an authenticated request to the vendor
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    ///
    /// Any HTTP status is returned as a [`RawResponse`]; only failures to
    /// get a response at all (timeouts, connection errors) are errors here.
    async fn send(&self, request: &RequestSpec) -> Result<RawResponse>;
}

/// Classify a response status.
///
/// 2xx passes; 429 and 5xx are retryable; every other status is a
/// non-retryable rejection.
pub fn classify_status(response: &RawResponse) -> Result<()> {
    let status = response.status;
    match status {
        200..=299 => Ok(()),
        429 | 500..=599 => Err(Error::retryable(
            Some(status),
            format!("vendor returned HTTP {status}"),
        )),
        _ => Err(Error::non_retryable(
            Some(status),
            format!("vendor returned HTTP {status}: {}", snippet(&response.body)),
        )),
    }
}

fn snippet(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
