//! Tests for poll state stores

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use chrono::Duration as ChronoDuration;
use tempfile::tempdir;

fn identity() -> ConnectorIdentity {
    ConnectorIdentity::new("slack", "access", "acme")
}

fn other_identity() -> ConnectorIdentity {
    ConnectorIdentity::new("slack", "integration", "acme")
}

const TTL: Duration = Duration::from_secs(60);

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_cursor_serialization() {
    let json = serde_json::to_string(&Cursor::Timestamp(1_422_922_864)).unwrap();
    assert_eq!(json, r#"{"type":"timestamp","value":1422922864}"#);

    let cursor: Cursor = serde_json::from_str(r#"{"type":"token","value":"abc"}"#).unwrap();
    assert_eq!(cursor.as_token(), Some("abc"));
    assert_eq!(cursor.as_timestamp(), None);
}

#[test]
fn test_cursor_as_datetime() {
    let cursor = Cursor::Timestamp(1_422_922_864);
    assert_eq!(cursor.as_datetime().unwrap().timestamp(), 1_422_922_864);
    assert!(Cursor::Token("t".to_string()).as_datetime().is_none());
}

#[test]
fn test_poll_state_roundtrip_is_exact() {
    let state = PollState::new(Cursor::Timestamp(42));
    let json = serde_json::to_string(&state).unwrap();
    let restored: PollState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
}

// ============================================================================
// In-memory store
// ============================================================================

#[tokio::test]
async fn test_memory_get_absent() {
    let store = InMemoryStateStore::new();
    assert!(store.get(&identity()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_put_from_absent() {
    let store = InMemoryStateStore::new();
    let state = PollState::new(Cursor::Timestamp(100));

    let outcome = store.put(&identity(), state.clone(), None).await.unwrap();
    assert_eq!(outcome, PutOutcome::Committed);
    assert_eq!(store.get(&identity()).await.unwrap(), Some(state));
    assert!(store.get(&other_identity()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_put_conflict_leaves_state() {
    let store = InMemoryStateStore::new();
    let first = PollState::new(Cursor::Timestamp(100));
    store.put(&identity(), first.clone(), None).await.unwrap();

    // Expecting "absent" while a state exists is a conflict
    let outcome = store
        .put(&identity(), PollState::new(Cursor::Timestamp(200)), None)
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Conflict);
    assert_eq!(store.get(&identity()).await.unwrap(), Some(first.clone()));

    // Matching expectation commits
    let second = PollState::new(Cursor::Timestamp(200));
    let outcome = store
        .put(&identity(), second.clone(), Some(&first))
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Committed);
    assert_eq!(store.get(&identity()).await.unwrap(), Some(second));
}

#[tokio::test]
async fn test_memory_lease_is_exclusive() {
    let store = InMemoryStateStore::new();
    let lease = store.acquire_lease(&identity(), TTL).await.unwrap();

    let err = store.acquire_lease(&identity(), TTL).await.unwrap_err();
    assert!(matches!(err, Error::LeaseHeld { .. }));

    // Other identities are independent
    let other = store.acquire_lease(&other_identity(), TTL).await.unwrap();
    assert_eq!(store.lease_count().await, 2);

    store.release_lease(&lease).await.unwrap();
    store.release_lease(&other).await.unwrap();
    assert_eq!(store.lease_count().await, 0);
    assert!(store.acquire_lease(&identity(), TTL).await.is_ok());
}

#[tokio::test]
async fn test_memory_expired_lease_is_taken_over() {
    let store = InMemoryStateStore::new();
    let stale = store
        .acquire_lease(&identity(), Duration::from_secs(0))
        .await
        .unwrap();

    let fresh = store.acquire_lease(&identity(), TTL).await.unwrap();
    assert_ne!(stale.token, fresh.token);

    // Releasing the stale lease must not drop the new holder's lease
    store.release_lease(&stale).await.unwrap();
    assert_eq!(store.lease_count().await, 1);
    assert!(matches!(
        store.acquire_lease(&identity(), TTL).await,
        Err(Error::LeaseHeld { .. })
    ));
}

#[test]
fn test_lease_expiry() {
    let now = chrono::Utc::now();
    let lease = Lease {
        identity: identity(),
        token: uuid::Uuid::new_v4(),
        expires_at: now + ChronoDuration::seconds(10),
    };
    assert!(!lease.is_expired(now));
    assert!(lease.is_expired(now + ChronoDuration::seconds(10)));
}

// ============================================================================
// File store
// ============================================================================

#[tokio::test]
async fn test_file_store_persists_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let state = PollState::new(Cursor::Timestamp(1_422_922_864));
    {
        let store = FileStateStore::open(&path).unwrap();
        assert!(store.get(&identity()).await.unwrap().is_none());
        store.put(&identity(), state.clone(), None).await.unwrap();
    }

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reopened = FileStateStore::open(&path).unwrap();
    assert_eq!(reopened.get(&identity()).await.unwrap(), Some(state));
}

#[tokio::test]
async fn test_file_store_conflict_does_not_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = FileStateStore::open(&path).unwrap();

    let stale = PollState::new(Cursor::Timestamp(1));
    let outcome = store
        .put(&identity(), PollState::new(Cursor::Timestamp(2)), Some(&stale))
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Conflict);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_file_store_lease_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = FileStateStore::open(&path).unwrap();
    let lease = store.acquire_lease(&identity(), TTL).await.unwrap();

    // A second process opening the same file sees the unexpired lease
    let reopened = FileStateStore::open(&path).unwrap();
    assert!(matches!(
        reopened.acquire_lease(&identity(), TTL).await,
        Err(Error::LeaseHeld { .. })
    ));

    store.release_lease(&lease).await.unwrap();
    let reopened = FileStateStore::open(&path).unwrap();
    assert!(reopened.acquire_lease(&identity(), TTL).await.is_ok());
}

#[test]
fn test_file_store_rejects_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "not json").unwrap();

    let err = FileStateStore::open(&path).unwrap_err();
    assert!(matches!(err, Error::State { .. }));
}

// ============================================================================
// Credential store
// ============================================================================

#[tokio::test]
async fn test_static_auth_store() {
    let store = StaticAuthStore::new().with(
        identity(),
        AuthConfig::new().with("auth_token", "xoxp-1234"),
    );

    let config = store.get(&identity()).await.unwrap();
    assert_eq!(config.get("auth_token"), Some("xoxp-1234"));

    let unknown = store.get(&other_identity()).await.unwrap();
    assert!(unknown.is_empty());
}
