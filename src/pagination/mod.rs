//! Pagination module
//!
//! # Overview
//!
//! A [`PaginationMarker`] is what a connector variant's `parse_response`
//! hands back after one page and what its next `build_request` consumes.
//! The engine never looks inside the marker, so a vendor may paginate by
//! page number, offset or continuation token without the engine knowing.

mod types;

pub use types::{PageCounts, PaginationMarker};
