//! File-backed poll state store
//!
//! Keeps the whole state document in memory and rewrites the JSON file
//! after every mutation with a temp-file-then-rename write.

use super::document::StateDocument;
use super::types::{Lease, PollState, PutOutcome};
use super::PollStateStore;
use crate::connector::ConnectorIdentity;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Poll state store persisted to a single JSON file
#[derive(Debug, Clone)]
pub struct FileStateStore {
    /// Path to the state file
    path: PathBuf,
    /// Current document (cached); the lock also serializes file writes
    doc: Arc<Mutex<StateDocument>>,
}

impl FileStateStore {
    /// Open a store, loading existing state if the file is present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;
            serde_json::from_str(&contents).map_err(|e| Error::State {
                message: format!("Failed to parse state file: {e}"),
            })?
        } else {
            StateDocument::default()
        };

        Ok(Self {
            path,
            doc: Arc::new(Mutex::new(doc)),
        })
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, doc: &StateDocument) -> Result<()> {
        let contents = serde_json::to_string_pretty(doc).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        debug!(path = %self.path.display(), "State file written");
        Ok(())
    }

    /// Apply a mutation and persist it; the in-memory copy is rolled back if the write fails
    async fn mutate<T>(&self, f: impl FnOnce(&mut StateDocument) -> Result<T>) -> Result<T> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *doc = next;
        Ok(out)
    }
}

#[async_trait]
impl PollStateStore for FileStateStore {
    async fn get(&self, identity: &ConnectorIdentity) -> Result<Option<PollState>> {
        Ok(self.doc.lock().await.get(identity))
    }

    async fn put(
        &self,
        identity: &ConnectorIdentity,
        state: PollState,
        expected: Option<&PollState>,
    ) -> Result<PutOutcome> {
        {
            let doc = self.doc.lock().await;
            if doc.states.get(&identity.key()) != expected {
                return Ok(PutOutcome::Conflict);
            }
        }
        self.mutate(|doc| Ok(doc.put(identity, state, expected)))
            .await
    }

    async fn acquire_lease(&self, identity: &ConnectorIdentity, ttl: Duration) -> Result<Lease> {
        self.mutate(|doc| doc.acquire_lease(identity, ttl, Utc::now()))
            .await
    }

    async fn release_lease(&self, lease: &Lease) -> Result<()> {
        let held = {
            let doc = self.doc.lock().await;
            doc.leases
                .get(&lease.identity.key())
                .is_some_and(|l| l.token == lease.token)
        };
        if !held {
            return Ok(());
        }
        self.mutate(|doc| {
            doc.release_lease(lease);
            Ok(())
        })
        .await
    }
}
