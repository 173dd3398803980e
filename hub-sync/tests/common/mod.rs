//! Shared fixtures for the hub-sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hub_sync::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// In-memory remote store with switchable failures
#[derive(Default)]
pub struct FakeRemote {
    rows: Mutex<Vec<RemoteRow>>,
    config: Mutex<HashMap<String, serde_json::Value>>,
    offline: Mutex<bool>,
    rejected_ids: Mutex<HashSet<String>>,
    unreachable_ids: Mutex<HashSet<String>>,
    /// Ids in the order upserts were attempted
    pub upsert_log: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Make every write of `id` fail with a constraint violation
    pub fn reject_id(&self, id: &str) {
        self.rejected_ids.lock().unwrap().insert(id.to_string());
    }

    /// Make every write of `id` look like a dropped connection
    pub fn unreachable_on(&self, id: &str) {
        self.unreachable_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn restore(&self) {
        self.set_offline(false);
        self.unreachable_ids.lock().unwrap().clear();
        self.rejected_ids.lock().unwrap().clear();
    }

    pub fn seed_row(&self, row: RemoteRow) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn seed_config(&self, key: &str, value: serde_json::Value) {
        self.config.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn config_value(&self, key: &str) -> Option<serde_json::Value> {
        self.config.lock().unwrap().get(key).cloned()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().iter().map(|r| r.id.clone()).collect()
    }

    pub fn upserted(&self) -> Vec<String> {
        self.upsert_log.lock().unwrap().clone()
    }

    fn check_online(&self) -> RemoteResult<()> {
        if *self.offline.lock().unwrap() {
            Err(RemoteError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_accepted(&self, id: &str) -> RemoteResult<()> {
        if self.unreachable_ids.lock().unwrap().contains(id) {
            return Err(RemoteError::Unavailable(format!("connection reset writing {}", id)));
        }
        if self.rejected_ids.lock().unwrap().contains(id) {
            Err(RemoteError::Rejected {
                status: 400,
                message: format!("row {} violates check constraint", id),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn insert(&self, row: &RemoteRow) -> RemoteResult<()> {
        self.check_online()?;
        self.check_accepted(&row.id)?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.id == row.id) {
            return Err(RemoteError::Rejected {
                status: 409,
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }
        rows.push(row.clone());
        Ok(())
    }

    async fn upsert(&self, row: &RemoteRow) -> RemoteResult<()> {
        self.upsert_log.lock().unwrap().push(row.id.clone());
        self.check_online()?;
        self.check_accepted(&row.id)?;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(())
    }

    async fn select_all(&self) -> RemoteResult<Vec<RemoteRow>> {
        self.check_online()?;
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn delete_all(&self) -> RemoteResult<()> {
        self.check_online()?;
        self.rows.lock().unwrap().clear();
        Ok(())
    }

    async fn get_config_value(&self, key: &str) -> RemoteResult<Option<serde_json::Value>> {
        self.check_online()?;
        Ok(self.config_value(key))
    }

    async fn set_config_value(&self, key: &str, value: serde_json::Value) -> RemoteResult<()> {
        self.check_online()?;
        self.seed_config(key, value);
        Ok(())
    }
}

/// Engine over a fresh in-memory cache and `remote`
pub fn engine_with(remote: Arc<FakeRemote>) -> SyncEngine {
    SyncEngine::new(Arc::new(MemoryCache::new()), Some(remote as Arc<dyn RemoteStore>))
}

pub fn record(id: &str, timestamp: i64) -> RedemptionRecord {
    RedemptionRecord {
        id: id.to_string(),
        voucher_name: "Huggies Voucher".to_string(),
        pharmacy_name: "Rayan Main".to_string(),
        pharmacist_id: "101".to_string(),
        customer_phone_number: "0501234567".to_string(),
        lakum_status: LakumStatus::NewEnrollment,
        date: "2024-01-10".to_string(),
        timestamp,
        user_id: "agent-x1".to_string(),
        is_synced: false,
    }
}

pub fn ids(records: &[RedemptionRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}
