//! Tests for the sink module

use super::*;
use crate::connector::{ConnectorIdentity, FetchWindow};
use crate::error::FailureKind;
use crate::state::Cursor;
use crate::types::from_epoch_seconds;
use arrow::array::Array;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

fn event(user: &str, ts: i64) -> NormalizedEvent {
    NormalizedEvent {
        service: "slack".to_string(),
        log_type: "access".to_string(),
        source_event_id: None,
        observed_at: from_epoch_seconds(ts),
        payload: json!({"user_id": user, "date_last": ts}),
    }
}

fn batch(events: Vec<NormalizedEvent>) -> LogBatch {
    let mut batch = LogBatch::new(
        ConnectorIdentity::new("slack", "access", "acme"),
        FetchWindow::new(Cursor::Timestamp(0), chrono::Utc::now()),
    );
    batch.events = events;
    batch
}

// ============================================================================
// MemorySink
// ============================================================================

#[tokio::test]
async fn test_memory_sink_records_batches() {
    let sink = MemorySink::new();
    sink.emit(&batch(vec![event("U1", 1)])).await.unwrap();
    sink.emit(&batch(vec![event("U2", 2), event("U3", 3)]))
        .await
        .unwrap();

    assert_eq!(sink.batches().await.len(), 2);
    let users: Vec<_> = sink
        .events()
        .await
        .into_iter()
        .map(|e| e.payload["user_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users, vec!["U1", "U2", "U3"]);
}

#[tokio::test]
async fn test_memory_sink_refusal() {
    let sink = MemorySink::refusing();
    let err = sink.emit(&batch(vec![event("U1", 1)])).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::SinkAck);
    assert!(sink.batches().await.is_empty());

    sink.set_refuse(false);
    sink.emit(&batch(vec![event("U1", 1)])).await.unwrap();
    assert_eq!(sink.batches().await.len(), 1);
}

// ============================================================================
// JsonLinesSink
// ============================================================================

#[tokio::test]
async fn test_json_lines_sink_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let sink = JsonLinesSink::new(&path).with_chunk_size(1);

    sink.emit(&batch(vec![event("U1", 1), event("U2", 2)]))
        .await
        .unwrap();
    sink.emit(&batch(vec![event("U3", 3)])).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["instance_id"], "acme");
    assert_eq!(lines[0]["service"], "slack");
    assert_eq!(lines[0]["payload"]["user_id"], "U1");
    assert_eq!(lines[2]["payload"]["user_id"], "U3");
    assert!(lines[0].get("source_event_id").is_none());
}

#[tokio::test]
async fn test_json_lines_sink_empty_batch_creates_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let sink = JsonLinesSink::new(&path);

    sink.emit(&batch(vec![])).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_json_lines_sink_unwritable_path_is_not_acked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("events.jsonl");
    let sink = JsonLinesSink::new(&path);

    let err = sink.emit(&batch(vec![event("U1", 1)])).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::SinkAck);
}

// ============================================================================
// ParquetSink
// ============================================================================

#[test]
fn test_batch_to_arrow_chunks() {
    let b = batch(vec![event("U1", 1), event("U2", 2), event("U3", 3)]);
    let record_batches = batch_to_arrow(&b, 2).unwrap();

    assert_eq!(record_batches.len(), 2);
    assert_eq!(record_batches[0].num_rows(), 2);
    assert_eq!(record_batches[1].num_rows(), 1);
    assert_eq!(record_batches[0].schema(), event_schema());

    let source_ids = record_batches[0].column(3);
    assert_eq!(source_ids.null_count(), 2);
}

#[tokio::test]
async fn test_parquet_sink_writes_file() {
    let dir = tempdir().unwrap();
    let sink = ParquetSink::new(dir.path()).with_chunk_size(2);

    sink.emit(&batch(vec![event("U1", 1), event("U2", 2), event("U3", 3)]))
        .await
        .unwrap();

    let partition = dir.path().join("slack").join("access").join("acme");
    let day_dir = std::fs::read_dir(&partition)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let files: Vec<_> = std::fs::read_dir(&day_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().unwrap(), "parquet");

    let file = std::fs::File::open(&files[0]).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(rows, 3);
}

#[tokio::test]
async fn test_parquet_sink_skips_empty_batch() {
    let dir = tempdir().unwrap();
    let sink = ParquetSink::new(dir.path());

    sink.emit(&batch(vec![])).await.unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
