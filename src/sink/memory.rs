//! In-memory sink

use super::Sink;
use crate::connector::{LogBatch, NormalizedEvent};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Sink that keeps every acknowledged batch in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<LogBatch>>>,
    refuse: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl MemorySink {
    /// Create an acknowledging sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that refuses every batch
    pub fn refusing() -> Self {
        let sink = Self::default();
        sink.set_refuse(true);
        sink
    }

    /// Wait `delay` before handling each batch
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Toggle whether batches are refused
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// All acknowledged batches, in emit order
    pub async fn batches(&self) -> Vec<LogBatch> {
        self.batches.lock().await.clone()
    }

    /// All acknowledged events, flattened
    pub async fn events(&self) -> Vec<NormalizedEvent> {
        self.batches
            .lock()
            .await
            .iter()
            .flat_map(|b| b.events.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn emit(&self, batch: &LogBatch) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::sink_ack("memory sink is refusing batches"));
        }
        self.batches.lock().await.push(batch.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
