//! State management module
//!
//! Persisted incremental cursors, per-identity leases, and the read-only
//! credential store the engine consults.
//!
//! # Overview
//!
//! The state module provides:
//! - `PollState` / `Cursor` - where the next cycle's window begins
//! - `PollStateStore` - get / compare-and-put / lease contract
//! - `InMemoryStateStore` and `FileStateStore` implementations
//! - `AuthConfigStore` with a configuration-backed `StaticAuthStore`
//!
//! A poll state is written only by the engine, only after the sink has
//! acknowledged a cycle's batch, and only if it still equals the state the
//! cycle started from.

mod credentials;
mod document;
mod file;
mod memory;
mod types;

pub use credentials::{AuthConfigStore, StaticAuthStore};
pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use types::{Cursor, Lease, PollState, PutOutcome};

use crate::connector::ConnectorIdentity;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Persistence contract for poll state and cycle leases
#[async_trait]
pub trait PollStateStore: Send + Sync {
    /// Current state of an identity, absent before its first successful cycle
    async fn get(&self, identity: &ConnectorIdentity) -> Result<Option<PollState>>;

    /// Write `state` only if the stored state still equals `expected`
    async fn put(
        &self,
        identity: &ConnectorIdentity,
        state: PollState,
        expected: Option<&PollState>,
    ) -> Result<PutOutcome>;

    /// Take the single-flight lease for an identity.
    ///
    /// Fails with [`crate::Error::LeaseHeld`] while an unexpired lease exists.
    async fn acquire_lease(&self, identity: &ConnectorIdentity, ttl: Duration) -> Result<Lease>;

    /// Give a lease back; a lease that was already taken over is ignored
    async fn release_lease(&self, lease: &Lease) -> Result<()>;
}

#[cfg(test)]
mod tests;
