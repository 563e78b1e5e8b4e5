//! Newline-delimited JSON sinks

use super::{EventRecord, Sink};
use crate::connector::LogBatch;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

fn render_lines(batch: &LogBatch) -> Result<Vec<String>> {
    EventRecord::from_batch(batch)
        .map(|record| serde_json::to_string(&record).map_err(Error::from))
        .collect()
}

/// Appends one JSON envelope per line to a file
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    chunk_size: usize,
    /// Serializes appends from concurrently running cycles
    lock: Mutex<()>,
}

impl JsonLinesSink {
    /// Create a sink appending to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: 1000,
            lock: Mutex::new(()),
        }
    }

    /// Set how many lines are written per write call
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Get the output path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    async fn emit(&self, batch: &LogBatch) -> Result<()> {
        let lines = render_lines(batch)
            .map_err(|e| Error::sink_ack(format!("Failed to serialize batch: {e}")))?;
        if lines.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::sink_ack(format!("Failed to open {}: {e}", self.path.display())))?;

        for chunk in lines.chunks(self.chunk_size) {
            let mut buf = chunk.join("\n");
            buf.push('\n');
            file.write_all(buf.as_bytes())
                .await
                .map_err(|e| Error::sink_ack(format!("Failed to write batch: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| Error::sink_ack(format!("Failed to flush batch: {e}")))?;
        file.sync_data()
            .await
            .map_err(|e| Error::sink_ack(format!("Failed to sync batch: {e}")))?;

        debug!(path = %self.path.display(), events = lines.len(), "Batch appended");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json_lines"
    }
}

/// Writes one JSON envelope per line to standard output
#[derive(Debug, Default)]
pub struct StdoutSink {
    lock: Mutex<()>,
}

impl StdoutSink {
    /// Create a stdout sink
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn emit(&self, batch: &LogBatch) -> Result<()> {
        let lines = render_lines(batch)
            .map_err(|e| Error::sink_ack(format!("Failed to serialize batch: {e}")))?;
        if lines.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let mut out = tokio::io::stdout();
        let mut buf = lines.join("\n");
        buf.push('\n');
        out.write_all(buf.as_bytes())
            .await
            .map_err(|e| Error::sink_ack(format!("Failed to write to stdout: {e}")))?;
        out.flush()
            .await
            .map_err(|e| Error::sink_ack(format!("Failed to flush stdout: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
