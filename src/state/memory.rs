//! In-memory poll state store

use super::document::StateDocument;
use super::types::{Lease, PollState, PutOutcome};
use super::PollStateStore;
use crate::connector::ConnectorIdentity;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Poll state store that lives only as long as the process
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    doc: Arc<Mutex<StateDocument>>,
}

impl InMemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a state directly, bypassing the compare-and-put check
    pub async fn seed(&self, identity: &ConnectorIdentity, state: PollState) {
        self.doc.lock().await.states.insert(identity.key(), state);
    }

    /// Number of currently held (possibly expired) leases
    pub async fn lease_count(&self) -> usize {
        self.doc.lock().await.leases.len()
    }
}

#[async_trait]
impl PollStateStore for InMemoryStateStore {
    async fn get(&self, identity: &ConnectorIdentity) -> Result<Option<PollState>> {
        Ok(self.doc.lock().await.get(identity))
    }

    async fn put(
        &self,
        identity: &ConnectorIdentity,
        state: PollState,
        expected: Option<&PollState>,
    ) -> Result<PutOutcome> {
        Ok(self.doc.lock().await.put(identity, state, expected))
    }

    async fn acquire_lease(&self, identity: &ConnectorIdentity, ttl: Duration) -> Result<Lease> {
        self.doc.lock().await.acquire_lease(identity, ttl, Utc::now())
    }

    async fn release_lease(&self, lease: &Lease) -> Result<()> {
        self.doc.lock().await.release_lease(lease);
        Ok(())
    }
}
