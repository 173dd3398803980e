//! Integration tests for the sync engine against an in-memory remote
//!
//! Covers the offline behaviour end to end:
//! 1. Push-on-create with the remote up and down
//! 2. Retry of pending records (ordering, halting, rejection)
//! 3. Pull-and-merge precedence
//! 4. Destructive operations
//! 5. Reference lists and the admin credential
//! 6. Concurrent callers

mod common;

use common::{engine_with, ids, record, FakeRemote};
use hub_sync::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const R1_TIMESTAMP: i64 = 1_700_000_000_000;

// ----------------------------------------------------------------------
// Push-on-create
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_r1_created_with_remote_reachable() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());

    let synced = engine.create_and_push(record("R1", R1_TIMESTAMP)).await.unwrap();
    assert!(synced);

    let cached = engine.cached_records().await.unwrap();
    assert_eq!(ids(&cached), vec!["R1"]);
    assert!(cached[0].is_synced);
    assert_eq!(cached[0].voucher_name, "Huggies Voucher");
    assert_eq!(cached[0].lakum_status, LakumStatus::NewEnrollment);

    assert_eq!(remote.row_ids(), vec!["R1"]);
    assert!(engine.last_backup().await.unwrap().is_some());
}

#[tokio::test]
async fn test_r1_created_with_remote_throwing() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    let synced = engine.create_and_push(record("R1", R1_TIMESTAMP)).await.unwrap();
    assert!(!synced);

    let cached = engine.cached_records().await.unwrap();
    assert_eq!(ids(&cached), vec!["R1"]);
    assert!(cached[0].is_pending());
    assert!(remote.row_ids().is_empty());
    assert_eq!(engine.last_backup().await.unwrap(), None);

    remote.restore();
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);

    let cached = engine.cached_records().await.unwrap();
    assert!(cached[0].is_synced);
    assert_eq!(remote.row_ids(), vec!["R1"]);
    assert!(engine.last_backup().await.unwrap().is_some());
}

#[tokio::test]
async fn test_created_records_are_newest_first() {
    let engine = engine_with(FakeRemote::new());

    engine.create_and_push(record("A", 1)).await.unwrap();
    engine.create_and_push(record("B", 2)).await.unwrap();
    engine.create_and_push(record("C", 3)).await.unwrap();

    assert_eq!(ids(&engine.cached_records().await.unwrap()), vec!["C", "B", "A"]);
}

#[tokio::test]
async fn test_push_is_idempotent() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("R1", R1_TIMESTAMP)).await.unwrap();
    remote.restore();
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);

    // Same record pushed again: the first-write insert is refused, the
    // retry upserts over the existing row
    let synced = engine.create_and_push(record("R1", R1_TIMESTAMP)).await.unwrap();
    assert!(!synced);
    assert_eq!(engine.cached_records().await.unwrap().len(), 1);
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);
    assert_eq!(engine.reconcile_pending().await.unwrap(), 0);

    assert_eq!(remote.row_ids(), vec!["R1"]);
    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["R1"]);
}

#[tokio::test]
async fn test_no_data_loss_under_outage() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    for (i, id) in ["A", "B", "C"].into_iter().enumerate() {
        assert!(!engine.create_and_push(record(id, i as i64)).await.unwrap());
    }

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["C", "B", "A"]);
    assert!(merged.iter().all(|r| r.is_pending()));
    assert_eq!(engine.pending_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_pending_record_unknown_remotely_survives_merge() {
    let remote = FakeRemote::new();
    remote.seed_row(record("OLD", 1).to_remote());
    remote.reject_id("NEW");
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("NEW", 2)).await.unwrap();

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["NEW", "OLD"]);
    assert!(merged[0].is_pending());
    assert!(merged[1].is_synced);

    // Merge result replaces the cache
    assert_eq!(ids(&engine.cached_records().await.unwrap()), vec!["NEW", "OLD"]);
}

// ----------------------------------------------------------------------
// Retry of pending records
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_eventual_convergence_after_partial_restoration() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    for (i, id) in ["A", "B", "C", "D"].into_iter().enumerate() {
        engine.create_and_push(record(id, i as i64)).await.unwrap();
    }

    // Remote comes back but drops the connection on C
    remote.set_offline(false);
    remote.unreachable_on("C");
    assert_eq!(engine.reconcile_pending().await.unwrap(), 2);
    assert_eq!(engine.pending_count().await.unwrap(), 2);

    remote.restore();
    assert_eq!(engine.reconcile_pending().await.unwrap(), 2);

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(merged.len(), 4);
    assert!(merged.iter().all(|r| r.is_synced));
    let unique: HashSet<&str> = ids(&merged).into_iter().collect();
    assert_eq!(unique.len(), 4);
    assert_eq!(remote.row_ids().len(), 4);
}

#[tokio::test]
async fn test_reconcile_stops_at_first_unreachable_failure() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("A", 1)).await.unwrap();
    engine.create_and_push(record("B", 2)).await.unwrap();
    engine.create_and_push(record("C", 3)).await.unwrap();

    remote.set_offline(false);
    remote.unreachable_on("B");
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);

    // Oldest first, nothing attempted after B
    assert_eq!(remote.upserted(), vec!["A", "B"]);

    let cached = engine.cached_records().await.unwrap();
    let status: Vec<(&str, bool)> = cached.iter().map(|r| (r.id.as_str(), r.is_synced)).collect();
    assert_eq!(status, vec![("C", false), ("B", false), ("A", true)]);
}

#[tokio::test]
async fn test_rejected_record_stays_pending_without_halting() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("A", 1)).await.unwrap();
    engine.create_and_push(record("B", 2)).await.unwrap();
    engine.create_and_push(record("C", 3)).await.unwrap();

    remote.set_offline(false);
    remote.reject_id("B");
    assert_eq!(engine.reconcile_pending().await.unwrap(), 2);
    assert_eq!(remote.upserted(), vec!["A", "B", "C"]);

    let pending: Vec<String> = engine
        .cached_records()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.is_pending())
        .map(|r| r.id)
        .collect();
    assert_eq!(pending, vec!["B"]);

    // Retried on the next pass once the remote accepts it
    remote.restore();
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);
    assert_eq!(engine.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reconcile_with_nothing_pending_touches_nothing() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("A", 1)).await.unwrap();
    assert_eq!(engine.reconcile_pending().await.unwrap(), 0);
    assert!(remote.upserted().is_empty());
}

// ----------------------------------------------------------------------
// Pull-and-merge
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_merge_precedence_on_duplicate_id() {
    let remote = FakeRemote::new();
    let mut remote_copy = record("X", 10);
    remote_copy.pharmacy_name = "Sahafa-ER".to_string();
    remote.seed_row(remote_copy.to_remote());
    // Keep the local copy pending through the reconcile step
    remote.reject_id("X");

    let engine = engine_with(remote.clone());
    engine.create_and_push(record("X", 10)).await.unwrap();
    assert_eq!(engine.pending_count().await.unwrap(), 1);

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["X"]);
    assert!(merged[0].is_synced);
    assert_eq!(merged[0].pharmacy_name, "Sahafa-ER");
}

#[tokio::test]
async fn test_merge_prunes_records_deleted_remotely() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());

    engine.create_and_push(record("A", 1)).await.unwrap();
    engine.create_and_push(record("B", 2)).await.unwrap();

    // Another device wiped the remote
    remote.delete_all().await.unwrap();
    remote.seed_row(record("Z", 9).to_remote());

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["Z"]);
}

#[tokio::test]
async fn test_merge_pushes_pending_before_pulling() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());
    engine.create_and_push(record("A", 1)).await.unwrap();

    remote.restore();
    remote.seed_row(record("B", 2).to_remote());

    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["B", "A"]);
    assert!(merged.iter().all(|r| r.is_synced));
}

// ----------------------------------------------------------------------
// Destructive operations
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_wipe_failure_keeps_local_records() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());
    engine.create_and_push(record("A", 1)).await.unwrap();

    remote.set_offline(true);
    let result = engine.wipe_all().await;
    assert!(matches!(result, Err(SyncError::WipeFailed(RemoteError::Unavailable(_)))));

    assert_eq!(ids(&engine.cached_records().await.unwrap()), vec!["A"]);
    assert_eq!(remote.row_ids(), vec!["A"]);
}

#[tokio::test]
async fn test_wipe_clears_both_sides() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());
    engine.create_and_push(record("A", 1)).await.unwrap();
    engine.create_and_push(record("B", 2)).await.unwrap();

    engine.wipe_all().await.unwrap();

    assert!(engine.cached_records().await.unwrap().is_empty());
    assert!(remote.row_ids().is_empty());
}

#[tokio::test]
async fn test_clear_local_records_leaves_remote_alone() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());
    engine.create_and_push(record("A", 1)).await.unwrap();

    engine.clear_local_records().await.unwrap();
    assert!(engine.cached_records().await.unwrap().is_empty());
    assert_eq!(remote.row_ids(), vec!["A"]);

    // Next refresh brings it back
    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(ids(&merged), vec!["A"]);
}

// ----------------------------------------------------------------------
// Reference lists
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_reference_list_reads_through_and_falls_back() {
    let remote = FakeRemote::new();
    remote.seed_config("voucher_list", json!(["Kotex Voucher", "Blevit Voucher"]));
    let engine = engine_with(remote.clone());

    let list = engine.fetch_reference_list(ReferenceListKind::Voucher).await.unwrap();
    assert_eq!(list, vec!["Kotex Voucher", "Blevit Voucher"]);

    // Offline: the copy written through on the last read
    remote.set_offline(true);
    let list = engine.fetch_reference_list(ReferenceListKind::Voucher).await.unwrap();
    assert_eq!(list, vec!["Kotex Voucher", "Blevit Voucher"]);

    // Never fetched: built-in defaults
    let pharmacies = engine.fetch_reference_list(ReferenceListKind::Pharmacy).await.unwrap();
    assert!(pharmacies.contains(&"Rayan Main".to_string()));
}

#[tokio::test]
async fn test_reference_list_accepts_string_encoded_json() {
    let remote = FakeRemote::new();
    remote.seed_config("pharmacy_list", json!("[\"Hamra\",\"Takhas OB\"]"));
    let engine = engine_with(remote);

    let list = engine.fetch_reference_list(ReferenceListKind::Pharmacy).await.unwrap();
    assert_eq!(list, vec!["Hamra", "Takhas OB"]);
}

#[tokio::test]
async fn test_reference_list_with_unexpected_shape_uses_defaults() {
    let remote = FakeRemote::new();
    remote.seed_config("voucher_list", json!({"not": "a list"}));
    let engine = engine_with(remote);

    let list = engine.fetch_reference_list(ReferenceListKind::Voucher).await.unwrap();
    assert_eq!(list, hub_sync::defaults::default_list(ReferenceListKind::Voucher));
}

#[tokio::test]
async fn test_reference_list_update_is_local_first() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = engine_with(remote.clone());

    let saved = engine
        .update_reference_list(ReferenceListKind::Voucher, vec!["Only Voucher".to_string()])
        .await
        .unwrap();
    assert!(!saved);
    assert_eq!(
        engine.fetch_reference_list(ReferenceListKind::Voucher).await.unwrap(),
        vec!["Only Voucher"]
    );

    remote.restore();
    let saved = engine
        .update_reference_list(ReferenceListKind::Voucher, vec!["Only Voucher".to_string()])
        .await
        .unwrap();
    assert!(saved);
    assert_eq!(remote.config_value("voucher_list"), Some(json!(["Only Voucher"])));
}

#[tokio::test]
async fn test_reference_list_update_without_remote_reports_success() {
    let engine = SyncEngine::new(Arc::new(MemoryCache::new()), None);
    let saved = engine
        .update_reference_list(ReferenceListKind::Pharmacy, vec!["Hamra".to_string()])
        .await
        .unwrap();
    assert!(saved);
}

#[tokio::test]
async fn test_add_and_remove_reference_entries() {
    let remote = FakeRemote::new();
    remote.seed_config("voucher_list", json!(["Kotex Voucher"]));
    let engine = engine_with(remote.clone());

    let added = engine
        .add_reference_entry(ReferenceListKind::Voucher, "  Pampers Voucher ")
        .await
        .unwrap();
    assert!(added.changed);
    assert_eq!(added.remote_saved, Some(true));
    assert_eq!(added.list, vec!["Kotex Voucher", "Pampers Voucher"]);
    assert_eq!(
        remote.config_value("voucher_list"),
        Some(json!(["Kotex Voucher", "Pampers Voucher"]))
    );

    let duplicate = engine
        .add_reference_entry(ReferenceListKind::Voucher, "Kotex Voucher")
        .await
        .unwrap();
    assert!(!duplicate.changed);
    assert_eq!(duplicate.remote_saved, None);

    let blank = engine.add_reference_entry(ReferenceListKind::Voucher, "   ").await.unwrap();
    assert!(!blank.changed);

    let removed = engine
        .remove_reference_entry(ReferenceListKind::Voucher, "Kotex Voucher")
        .await
        .unwrap();
    assert!(removed.changed);
    assert_eq!(removed.list, vec!["Pampers Voucher"]);

    let missing = engine
        .remove_reference_entry(ReferenceListKind::Voucher, "Kotex Voucher")
        .await
        .unwrap();
    assert!(!missing.changed);
}

// ----------------------------------------------------------------------
// Admin credential
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_admin_credential_strips_quotes() {
    let remote = FakeRemote::new();
    remote.seed_config("admin_password", json!("\"s3cret\""));
    let engine = engine_with(remote.clone());

    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "s3cret");

    // Remote goes away: cached copy
    remote.set_offline(true);
    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "s3cret");
}

#[tokio::test]
async fn test_admin_credential_ignores_unusable_remote_values() {
    let remote = FakeRemote::new();
    remote.seed_config("admin_password", json!("undefined"));
    let engine = engine_with(remote.clone())
        .with_default_admin_credential("fallback-pass");

    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "fallback-pass");

    remote.seed_config("admin_password", json!(""));
    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "fallback-pass");

    remote.seed_config("admin_password", json!(4321));
    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "4321");
}

#[tokio::test]
async fn test_admin_credential_update() {
    let remote = FakeRemote::new();
    let engine = engine_with(remote.clone());

    assert!(matches!(
        engine.update_admin_credential("").await,
        Err(SyncError::InvalidInput(_))
    ));

    assert!(engine.update_admin_credential("new-pass").await.unwrap());
    assert_eq!(remote.config_value("admin_password"), Some(json!("new-pass")));

    remote.set_offline(true);
    assert!(!engine.update_admin_credential("offline-pass").await.unwrap());
    assert_eq!(engine.fetch_admin_credential().await.unwrap(), "offline-pass");
}

// ----------------------------------------------------------------------
// Refresh, timeouts, concurrency
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_all_snapshot() {
    let remote = FakeRemote::new();
    remote.seed_row(record("A", 1).to_remote());
    remote.seed_config("voucher_list", json!(["Kotex Voucher"]));
    let engine = engine_with(remote);

    let snapshot = engine.refresh_all().await.unwrap();
    assert_eq!(ids(&snapshot.records), vec!["A"]);
    assert_eq!(snapshot.vouchers, vec!["Kotex Voucher"]);
    assert!(!snapshot.pharmacies.is_empty());
}

/// Remote whose calls never complete
struct StalledRemote;

#[async_trait::async_trait]
impl RemoteStore for StalledRemote {
    async fn insert(&self, _row: &RemoteRow) -> RemoteResult<()> {
        std::future::pending().await
    }

    async fn upsert(&self, _row: &RemoteRow) -> RemoteResult<()> {
        std::future::pending().await
    }

    async fn select_all(&self) -> RemoteResult<Vec<RemoteRow>> {
        std::future::pending().await
    }

    async fn delete_all(&self) -> RemoteResult<()> {
        std::future::pending().await
    }

    async fn get_config_value(&self, _key: &str) -> RemoteResult<Option<serde_json::Value>> {
        std::future::pending().await
    }

    async fn set_config_value(&self, _key: &str, _value: serde_json::Value) -> RemoteResult<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_stalled_remote_times_out_to_cache() {
    let remote = Arc::new(StalledRemote) as Arc<dyn RemoteStore>;
    let engine = SyncEngine::new(Arc::new(MemoryCache::new()), Some(remote))
        .with_remote_timeout(Duration::from_millis(50));

    assert!(!engine.create_and_push(record("A", 1)).await.unwrap());
    assert_eq!(engine.reconcile_pending().await.unwrap(), 0);
    assert_eq!(ids(&engine.fetch_and_merge_master().await.unwrap()), vec!["A"]);
    assert!(matches!(engine.wipe_all().await, Err(SyncError::WipeFailed(_))));
    assert_eq!(engine.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_create_and_reconcile_lose_nothing() {
    let remote = FakeRemote::new();
    remote.set_offline(true);
    let engine = Arc::new(engine_with(remote.clone()));

    // Half created offline, the rest while reconcile passes run
    for i in 0..10 {
        engine.create_and_push(record(&format!("OFF-{}", i), i)).await.unwrap();
    }
    remote.restore();

    let mut handles = Vec::new();
    for i in 0..10 {
        let creator = engine.clone();
        handles.push(tokio::spawn(async move {
            creator
                .create_and_push(record(&format!("ON-{}", i), 100 + i))
                .await
                .unwrap();
        }));
        let reconciler = engine.clone();
        handles.push(tokio::spawn(async move {
            reconciler.reconcile_pending().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    engine.reconcile_pending().await.unwrap();
    let merged = engine.fetch_and_merge_master().await.unwrap();
    assert_eq!(merged.len(), 20);
    assert!(merged.iter().all(|r| r.is_synced));
    let unique: HashSet<&str> = ids(&merged).into_iter().collect();
    assert_eq!(unique.len(), 20);
    assert_eq!(remote.row_ids().len(), 20);
}

#[tokio::test]
async fn test_sqlite_cache_keeps_pending_records_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = LocalCacheConfig {
        db_path: dir.path().join("hub.db").to_str().unwrap().to_string(),
        max_connections: 1,
        enable_wal: true,
    };

    let remote = FakeRemote::new();
    remote.set_offline(true);
    {
        let cache = SqliteCache::open(&config).await.unwrap();
        let engine = SyncEngine::new(Arc::new(cache), Some(remote.clone() as Arc<dyn RemoteStore>));
        engine.create_and_push(record("A", 1)).await.unwrap();
    }

    remote.restore();
    let cache = SqliteCache::open(&config).await.unwrap();
    let engine = SyncEngine::new(Arc::new(cache), Some(remote.clone() as Arc<dyn RemoteStore>));
    assert_eq!(engine.pending_count().await.unwrap(), 1);
    assert_eq!(engine.reconcile_pending().await.unwrap(), 1);
    assert_eq!(remote.row_ids(), vec!["A"]);
}
