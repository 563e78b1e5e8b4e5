// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # auditpull
//!
//! Incremental, crash-safe polling of SaaS audit logs into a downstream
//! alerting pipeline.
//!
//! ## Features
//!
//! - **Connector contract**: one variant per vendor and log type, selected by registry
//! - **Credential validation**: every field checked before any network use
//! - **Vendor-agnostic pagination**: opaque markers passed back to the variant
//! - **Crash-safe cursors**: state committed only after the sink acknowledged
//! - **Single flight**: one lease per connector instance, with a TTL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use auditpull::config::load_config;
//! use auditpull::connectors::builtin_registry;
//! use auditpull::engine::PollEngine;
//! use auditpull::http::HttpTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> auditpull::Result<()> {
//!     let config = load_config("auditpull.yaml")?;
//!     let engine = PollEngine::new(
//!         builtin_registry(&config.http.base_url_overrides)?,
//!         Arc::new(HttpTransport::with_config(config.transport_config())?),
//!         config.state_store()?,
//!         Arc::new(config.auth_store()?),
//!         config.sink()?,
//!     )
//!     .with_config(config.engine_config());
//!
//!     for (identity, result) in engine.run_many(&config.identities()).await {
//!         println!("{identity}: {:?}", result.map(|r| r.committed_cursor));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          PollEngine                             │
//! │  lease → validate → window → fetch ⇄ paginate → emit → commit   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │ Connector │  Pagination   │   State   │    Sink     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ AuthSpec │ Contract  │ Marker        │ Cursor    │ JSON lines  │
//! │ Validate │ Registry  │ has_more      │ Lease     │ Parquet     │
//! │ Bearer   │ Slack     │ Page bound    │ CAS put   │ Memory      │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and failure taxonomy
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential specs, validation and request authentication
pub mod auth;

/// HTTP transport with rate limiting
pub mod http;

/// Pagination markers
pub mod pagination;

/// Poll state, leases and credential stores
pub mod state;

/// Downstream sinks
pub mod sink;

/// Connector contract and registry
pub mod connector;

/// Built-in connector variants
pub mod connectors;

/// Poll engine
pub mod engine;

/// Application configuration
pub mod config;

/// Command-line interface
pub mod cli;

/// Test doubles and fixtures
pub mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, FailureKind, Result};
pub use types::*;

// Re-export commonly used types
pub use connector::{ConnectorContract, ConnectorIdentity, ConnectorRegistry};
pub use engine::{CycleReport, EngineConfig, PollEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
