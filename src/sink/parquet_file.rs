//! Parquet file sink
//!
//! Writes each batch as Arrow record batches into its own Parquet file,
//! partitioned by identity and day:
//! `{dir}/{service}/{log_type}/{instance_id}/dt={YYYY-MM-DD}/{fetched_at}-{id}.parquet`

use super::Sink;
use crate::connector::LogBatch;
use crate::error::{Error, Result};
use arrow::array::{ArrayRef, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Fixed Arrow schema of the event envelope
pub fn event_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("service", DataType::Utf8, false),
        Field::new("log_type", DataType::Utf8, false),
        Field::new("instance_id", DataType::Utf8, false),
        Field::new("source_event_id", DataType::Utf8, true),
        Field::new(
            "observed_at",
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
            true,
        ),
        Field::new("payload", DataType::Utf8, false),
    ]))
}

/// Convert a batch into Arrow record batches of at most `chunk_size` rows
pub fn batch_to_arrow(batch: &LogBatch, chunk_size: usize) -> Result<Vec<RecordBatch>> {
    let schema = event_schema();
    let instance_id = batch.identity.instance_id.as_str();

    batch
        .events
        .chunks(chunk_size.max(1))
        .map(|events| -> Result<RecordBatch> {
            let payloads = events
                .iter()
                .map(|e| serde_json::to_string(&e.payload))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let columns: Vec<ArrayRef> = vec![
                Arc::new(StringArray::from(
                    events.iter().map(|e| e.service.as_str()).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    events.iter().map(|e| e.log_type.as_str()).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(vec![instance_id; events.len()])),
                Arc::new(StringArray::from(
                    events
                        .iter()
                        .map(|e| e.source_event_id.as_deref())
                        .collect::<Vec<_>>(),
                )),
                Arc::new(
                    TimestampSecondArray::from(
                        events
                            .iter()
                            .map(|e| e.observed_at.map(|t| t.timestamp()))
                            .collect::<Vec<_>>(),
                    )
                    .with_timezone("UTC"),
                ),
                Arc::new(StringArray::from(payloads)),
            ];

            RecordBatch::try_new(schema.clone(), columns).map_err(Error::from)
        })
        .collect()
}

/// Writes one Parquet file per batch
#[derive(Debug, Clone)]
pub struct ParquetSink {
    dir: PathBuf,
    chunk_size: usize,
    compression: Compression,
}

impl ParquetSink {
    /// Create a sink writing under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            chunk_size: 10_000,
            compression: Compression::SNAPPY,
        }
    }

    /// Set the row group size
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Where a batch's file goes
    pub fn file_path(&self, batch: &LogBatch) -> PathBuf {
        let id = &batch.identity;
        let sanitize = |s: &str| s.replace(['/', '\\', '.'], "_");
        self.dir
            .join(sanitize(&id.service))
            .join(sanitize(&id.log_type))
            .join(sanitize(&id.instance_id))
            .join(format!("dt={}", batch.fetched_at.format("%Y-%m-%d")))
            .join(format!(
                "{}-{}.parquet",
                batch.fetched_at.timestamp(),
                Uuid::new_v4().simple()
            ))
    }
}

fn write_file(
    path: &Path,
    batches: &[RecordBatch],
    props: WriterProperties,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write to temp file first, then rename for atomicity
    let temp_path = path.with_extension("parquet.tmp");
    let file = File::create(&temp_path)?;
    let mut writer = ArrowWriter::try_new(file, event_schema(), Some(props))?;
    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;
    std::fs::rename(&temp_path, path)?;
    Ok(rows)
}

#[async_trait]
impl Sink for ParquetSink {
    async fn emit(&self, batch: &LogBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let record_batches = batch_to_arrow(batch, self.chunk_size)
            .map_err(|e| Error::sink_ack(format!("Failed to convert batch: {e}")))?;
        let path = self.file_path(batch);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.chunk_size)
            .build();

        let target = path.clone();
        let rows = tokio::task::spawn_blocking(move || write_file(&target, &record_batches, props))
            .await
            .map_err(|e| Error::sink_ack(format!("Parquet writer task failed: {e}")))?
            .map_err(|e| Error::sink_ack(format!("Failed to write {}: {e}", path.display())))?;

        debug!(path = %path.display(), rows, "Parquet file written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "parquet"
    }
}
