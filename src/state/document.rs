//! In-memory state document shared by the store implementations
//!
//! Holds every identity's poll state and lease. Store implementations
//! wrap it in a lock and decide whether to persist after a mutation.

use super::types::{Lease, PollState, PutOutcome};
use crate::connector::ConnectorIdentity;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StateDocument {
    #[serde(default)]
    pub states: BTreeMap<String, PollState>,
    #[serde(default)]
    pub leases: BTreeMap<String, Lease>,
}

impl StateDocument {
    pub fn get(&self, identity: &ConnectorIdentity) -> Option<PollState> {
        self.states.get(&identity.key()).cloned()
    }

    pub fn put(
        &mut self,
        identity: &ConnectorIdentity,
        state: PollState,
        expected: Option<&PollState>,
    ) -> PutOutcome {
        let key = identity.key();
        if self.states.get(&key) != expected {
            return PutOutcome::Conflict;
        }
        self.states.insert(key, state);
        PutOutcome::Committed
    }

    pub fn acquire_lease(
        &mut self,
        identity: &ConnectorIdentity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Lease> {
        let key = identity.key();
        if let Some(existing) = self.leases.get(&key) {
            if !existing.is_expired(now) {
                return Err(Error::LeaseHeld { identity: key });
            }
        }

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| Error::config(format!("lease ttl out of range: {e}")))?;
        let lease = Lease {
            identity: identity.clone(),
            token: Uuid::new_v4(),
            expires_at: now + ttl,
        };
        self.leases.insert(key, lease.clone());
        Ok(lease)
    }

    /// Returns whether a lease was actually removed
    pub fn release_lease(&mut self, lease: &Lease) -> bool {
        let key = lease.identity.key();
        match self.leases.get(&key) {
            Some(held) if held.token == lease.token => {
                self.leases.remove(&key);
                true
            }
            _ => false,
        }
    }
}
