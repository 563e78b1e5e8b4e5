//! Pagination marker types

use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// Opaque continuation returned by parsing one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationMarker {
    /// Variant-defined continuation value; `None` requests the first page
    pub marker: Option<JsonValue>,
    /// Whether another page should be fetched
    pub has_more: bool,
}

impl PaginationMarker {
    /// Marker for the first request of a cycle
    pub fn first() -> Self {
        Self::default()
    }

    /// More pages follow; continue with this marker
    pub fn next(marker: impl Into<JsonValue>) -> Self {
        Self {
            marker: Some(marker.into()),
            has_more: true,
        }
    }

    /// No further pages
    pub fn done() -> Self {
        Self {
            marker: None,
            has_more: false,
        }
    }

    /// Check if this is the first-page marker
    pub fn is_first(&self) -> bool {
        self.marker.is_none()
    }

    /// Marker value as text, for variants that send it as a request parameter
    pub fn as_param(&self) -> Option<String> {
        match self.marker.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Page-number paging block as reported by vendors like Slack
/// (`{"count": 100, "total": 2, "page": 1, "pages": 1}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageCounts {
    /// Current page (1-based)
    pub page: u64,
    /// Total number of pages
    pub pages: u64,
}

impl PageCounts {
    /// Marker that continues to the following page, or stops on the last one
    pub fn marker(self) -> PaginationMarker {
        if self.page < self.pages {
            PaginationMarker::next(self.page + 1)
        } else {
            PaginationMarker::done()
        }
    }
}
