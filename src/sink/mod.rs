//! Downstream sink module
//!
//! A [`Sink`] receives one [`LogBatch`] per successful fetch and either
//! acknowledges it (returns `Ok`) or does not. The engine commits poll
//! state only after an acknowledgement, so every sink here makes the batch
//! durable before returning `Ok`.
//!
//! # Overview
//!
//! - `MemorySink` - keeps batches in memory; can be told to refuse acks
//! - `StdoutSink` / `JsonLinesSink` - one JSON envelope per line
//! - `ParquetSink` - one Parquet file per batch, `chunk_size` rows per row group

mod json_lines;
mod memory;
mod parquet_file;

pub use self::json_lines::{JsonLinesSink, StdoutSink};
pub use self::memory::MemorySink;
pub use self::parquet_file::{batch_to_arrow, event_schema, ParquetSink};

use crate::connector::{LogBatch, NormalizedEvent};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Receiver of emitted batches
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver a batch; `Ok` is the acknowledgement
    async fn emit(&self, batch: &LogBatch) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// One line of JSON output: the event envelope plus the instance it came from
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Connector instance that produced the event
    pub instance_id: &'a str,
    /// The normalized event
    #[serde(flatten)]
    pub event: &'a NormalizedEvent,
}

impl<'a> EventRecord<'a> {
    /// Pair every event of a batch with the batch's instance id
    pub fn from_batch(batch: &'a LogBatch) -> impl Iterator<Item = EventRecord<'a>> + 'a {
        batch.events.iter().map(move |event| EventRecord {
            instance_id: &batch.identity.instance_id,
            event,
        })
    }
}

#[cfg(test)]
mod tests;
