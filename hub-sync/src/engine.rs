//! Sync engine
//!
//! Keeps the local cache and the remote store eventually consistent:
//! - push-on-create ([`SyncEngine::create_and_push`])
//! - retry of pending records ([`SyncEngine::reconcile_pending`])
//! - pull-and-merge on refresh ([`SyncEngine::fetch_and_merge_master`])
//! - read-through / write-through for reference lists and the admin credential
//!
//! Remote failures degrade to cache-only behaviour and are reported through
//! return values, never as errors. The only exception is
//! [`SyncEngine::wipe_all`]. Local cache failures are always errors.
//!
//! Every operation touching the record list holds one async mutex for its
//! whole read-modify-write, so a timer-driven reconcile and a manual refresh
//! can not lose each other's updates. Each reference list and the credential
//! have their own mutex.

use crate::config::{HubConfig, RemoteStatus};
use crate::defaults::{default_list, DEFAULT_ADMIN_CREDENTIAL};
use crate::error::{RemoteError, RemoteResult, SyncError, SyncResult};
use crate::local_cache::{get_json, set_json, CacheKey, LocalCache, SqliteCache};
use crate::model::{RedemptionRecord, ReferenceListKind, RemoteRow};
use crate::remote::{RemoteStore, RestRemoteStore};
use chrono::{DateTime, Utc};
use logger_redacted::{mask_phone, redact};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Remote config key of the admin credential
pub const ADMIN_CREDENTIAL_KEY: &str = "admin_password";

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of an add/remove on a reference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUpdate {
    /// List after the operation
    pub list: Vec<String>,
    /// Whether the list was modified
    pub changed: bool,
    /// Remote write outcome; `None` when nothing had to be written
    pub remote_saved: Option<bool>,
}

/// Everything a front end shows after a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSnapshot {
    pub records: Vec<RedemptionRecord>,
    pub vouchers: Vec<String>,
    pub pharmacies: Vec<String>,
}

pub struct SyncEngine {
    cache: Arc<dyn LocalCache>,
    remote: Option<Arc<dyn RemoteStore>>,
    remote_timeout: Duration,
    default_admin_credential: String,
    records_lock: Mutex<()>,
    voucher_lock: Mutex<()>,
    pharmacy_lock: Mutex<()>,
    credential_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create an engine over `cache`, optionally backed by `remote`
    pub fn new(cache: Arc<dyn LocalCache>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            cache,
            remote,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            default_admin_credential: DEFAULT_ADMIN_CREDENTIAL.to_string(),
            records_lock: Mutex::new(()),
            voucher_lock: Mutex::new(()),
            pharmacy_lock: Mutex::new(()),
            credential_lock: Mutex::new(()),
        }
    }

    /// Open the SQLite cache and, when configured, the REST remote
    pub async fn from_config(config: &HubConfig) -> SyncResult<Self> {
        let cache: Arc<dyn LocalCache> = Arc::new(SqliteCache::open(&config.cache).await?);

        let remote: Option<Arc<dyn RemoteStore>> = match &config.remote {
            Some(remote_config) => Some(Arc::new(RestRemoteStore::new(
                remote_config,
                config.remote_timeout(),
            )?)),
            None => {
                tracing::warn!("Remote store not configured, running cache-only");
                None
            }
        };

        Ok(Self::new(cache, remote)
            .with_remote_timeout(config.remote_timeout())
            .with_default_admin_credential(config.default_admin_credential.clone()))
    }

    /// Upper bound for each individual remote call
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_default_admin_credential(mut self, credential: impl Into<String>) -> Self {
        self.default_admin_credential = credential.into();
        self
    }

    pub fn remote_status(&self) -> RemoteStatus {
        if self.remote.is_some() {
            RemoteStatus::Configured
        } else {
            RemoteStatus::Disconnected
        }
    }

    // ------------------------------------------------------------------
    // Redemption records
    // ------------------------------------------------------------------

    /// Try to insert `record` remotely, then prepend it to the cache.
    ///
    /// The cache write happens whatever the remote outcome. Returns whether
    /// the record reached the remote.
    pub async fn create_and_push(&self, record: RedemptionRecord) -> SyncResult<bool> {
        let _guard = self.records_lock.lock().await;

        let mut record = record;
        record.is_synced = false;

        if let Some(remote) = &self.remote {
            match self.remote_call("insert", remote.insert(&record.to_remote())).await {
                Ok(()) => record.is_synced = true,
                Err(e) => log_remote_failure("insert", &e),
            }
        }

        let mut records = self.load_records().await?;
        records.retain(|r| r.id != record.id);
        records.insert(0, record.clone());
        self.store_records(&records).await?;

        if record.is_synced {
            self.mark_backup().await?;
        }

        tracing::info!(
            record_id = %record.id,
            voucher = %record.voucher_name,
            pharmacy = %record.pharmacy_name,
            customer = %mask_phone(&record.customer_phone_number),
            synced = record.is_synced,
            "Logged redemption"
        );

        Ok(record.is_synced)
    }

    /// Push every pending record, oldest first.
    ///
    /// Stops at the first failure that looks like the remote is offline. A
    /// rejected record stays pending and the pass moves on. Returns the
    /// number of records newly confirmed.
    pub async fn reconcile_pending(&self) -> SyncResult<usize> {
        let _guard = self.records_lock.lock().await;
        self.reconcile_locked().await
    }

    async fn reconcile_locked(&self) -> SyncResult<usize> {
        let Some(remote) = &self.remote else {
            return Ok(0);
        };

        let mut records = self.load_records().await?;

        // Cache is newest first; walk it backwards
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending())
            .map(|(idx, _)| idx)
            .rev()
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let mut synced = 0usize;
        for idx in pending {
            let Some(record) = records.get_mut(idx) else {
                continue;
            };

            match self.remote_call("upsert", remote.upsert(&record.to_remote())).await {
                Ok(()) => {
                    record.is_synced = true;
                    synced += 1;
                }
                Err(e) if e.is_unreachable() => {
                    log_remote_failure("upsert", &e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        record_id = %record.id,
                        error = %redact(&e.to_string()),
                        "Remote rejected pending record, keeping it queued"
                    );
                }
            }
        }

        if synced > 0 {
            self.store_records(&records).await?;
            self.mark_backup().await?;
            tracing::info!(synced, "Reconciled pending records");
        }

        Ok(synced)
    }

    /// Push pending records, pull the remote set and merge it into the cache.
    ///
    /// Pending records the remote does not know yet come first, followed by
    /// the remote records newest first. The merged list replaces the cache.
    /// Without a reachable remote the cache is returned unchanged.
    pub async fn fetch_and_merge_master(&self) -> SyncResult<Vec<RedemptionRecord>> {
        let _guard = self.records_lock.lock().await;

        self.reconcile_locked().await?;

        let Some(remote) = &self.remote else {
            return self.load_records().await;
        };

        let rows = match self.remote_call("select_all", remote.select_all()).await {
            Ok(rows) => rows,
            Err(e) => {
                log_remote_failure("select_all", &e);
                return self.load_records().await;
            }
        };

        let local = self.load_records().await?;
        let merged = merge_master(local, rows);
        self.store_records(&merged).await?;

        tracing::debug!(
            total = merged.len(),
            pending = merged.iter().filter(|r| r.is_pending()).count(),
            "Merged remote records into cache"
        );

        Ok(merged)
    }

    /// Records currently in the cache, without touching the remote
    pub async fn cached_records(&self) -> SyncResult<Vec<RedemptionRecord>> {
        let _guard = self.records_lock.lock().await;
        self.load_records().await
    }

    pub async fn pending_count(&self) -> SyncResult<usize> {
        let _guard = self.records_lock.lock().await;
        Ok(self.load_records().await?.iter().filter(|r| r.is_pending()).count())
    }

    /// Delete every record remotely, then locally.
    ///
    /// If the remote delete fails the cache is left untouched and
    /// [`SyncError::WipeFailed`] is returned.
    pub async fn wipe_all(&self) -> SyncResult<()> {
        let _guard = self.records_lock.lock().await;

        if let Some(remote) = &self.remote {
            self.remote_call("delete_all", remote.delete_all())
                .await
                .map_err(|e| {
                    tracing::error!(error = %redact(&e.to_string()), "Remote wipe failed");
                    SyncError::WipeFailed(e)
                })?;
        }

        self.cache.remove(CacheKey::Records).await?;
        tracing::info!("Wiped all redemption records");
        Ok(())
    }

    /// Forget the cached records; the remote is not touched
    pub async fn clear_local_records(&self) -> SyncResult<()> {
        let _guard = self.records_lock.lock().await;
        self.cache.remove(CacheKey::Records).await?;
        tracing::info!("Cleared local record cache");
        Ok(())
    }

    /// When a push last reached the remote
    pub async fn last_backup(&self) -> SyncResult<Option<DateTime<Utc>>> {
        match self.cache.get(CacheKey::LastBackup).await? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| SyncError::Serialization(format!("Invalid last backup time: {}", e))),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Reference lists
    // ------------------------------------------------------------------

    /// Remote value if available, else the cached list, else the built-in one
    pub async fn fetch_reference_list(&self, kind: ReferenceListKind) -> SyncResult<Vec<String>> {
        let _guard = self.list_lock(kind).lock().await;
        self.fetch_list_locked(kind).await
    }

    /// Save `list` locally, then try the remote. Returns the remote outcome.
    pub async fn update_reference_list(
        &self,
        kind: ReferenceListKind,
        list: Vec<String>,
    ) -> SyncResult<bool> {
        let _guard = self.list_lock(kind).lock().await;
        self.update_list_locked(kind, &list).await
    }

    /// Append `name` unless it is blank or already listed
    pub async fn add_reference_entry(
        &self,
        kind: ReferenceListKind,
        name: &str,
    ) -> SyncResult<ListUpdate> {
        let name = name.trim();
        let _guard = self.list_lock(kind).lock().await;

        let mut list = self.fetch_list_locked(kind).await?;
        if name.is_empty() || list.iter().any(|entry| entry == name) {
            return Ok(ListUpdate {
                list,
                changed: false,
                remote_saved: None,
            });
        }

        list.push(name.to_string());
        let remote_saved = self.update_list_locked(kind, &list).await?;
        Ok(ListUpdate {
            list,
            changed: true,
            remote_saved: Some(remote_saved),
        })
    }

    /// Drop every occurrence of `name`
    pub async fn remove_reference_entry(
        &self,
        kind: ReferenceListKind,
        name: &str,
    ) -> SyncResult<ListUpdate> {
        let name = name.trim();
        let _guard = self.list_lock(kind).lock().await;

        let mut list = self.fetch_list_locked(kind).await?;
        let before = list.len();
        list.retain(|entry| entry != name);
        if list.len() == before {
            return Ok(ListUpdate {
                list,
                changed: false,
                remote_saved: None,
            });
        }

        let remote_saved = self.update_list_locked(kind, &list).await?;
        Ok(ListUpdate {
            list,
            changed: true,
            remote_saved: Some(remote_saved),
        })
    }

    async fn fetch_list_locked(&self, kind: ReferenceListKind) -> SyncResult<Vec<String>> {
        let key = CacheKey::for_list(kind);

        if let Some(remote) = &self.remote {
            match self
                .remote_call("get_config_value", remote.get_config_value(kind.remote_key()))
                .await
            {
                Ok(Some(value)) => match parse_list_value(value) {
                    Some(list) => {
                        set_json(self.cache.as_ref(), key, &list).await?;
                        return Ok(list);
                    }
                    None => {
                        tracing::warn!(list = kind.label(), "Remote list has an unexpected shape")
                    }
                },
                Ok(None) => tracing::debug!(list = kind.label(), "List not stored remotely"),
                Err(e) => log_remote_failure("get_config_value", &e),
            }
        }

        Ok(get_json(self.cache.as_ref(), key)
            .await?
            .unwrap_or_else(|| default_list(kind)))
    }

    async fn update_list_locked(
        &self,
        kind: ReferenceListKind,
        list: &[String],
    ) -> SyncResult<bool> {
        set_json(self.cache.as_ref(), CacheKey::for_list(kind), list).await?;

        let Some(remote) = &self.remote else {
            return Ok(true);
        };

        let value = serde_json::to_value(list)?;
        match self
            .remote_call("set_config_value", remote.set_config_value(kind.remote_key(), value))
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                log_remote_failure("set_config_value", &e);
                Ok(false)
            }
        }
    }

    fn list_lock(&self, kind: ReferenceListKind) -> &Mutex<()> {
        match kind {
            ReferenceListKind::Voucher => &self.voucher_lock,
            ReferenceListKind::Pharmacy => &self.pharmacy_lock,
        }
    }

    // ------------------------------------------------------------------
    // Admin credential
    // ------------------------------------------------------------------

    /// Remote credential if usable, else the cached one, else the default
    pub async fn fetch_admin_credential(&self) -> SyncResult<String> {
        let _guard = self.credential_lock.lock().await;

        if let Some(remote) = &self.remote {
            match self
                .remote_call("get_config_value", remote.get_config_value(ADMIN_CREDENTIAL_KEY))
                .await
            {
                Ok(Some(value)) => {
                    if let Some(credential) = normalize_credential(&value) {
                        self.cache.set(CacheKey::AdminCredential, &credential).await?;
                        return Ok(credential);
                    }
                    tracing::warn!("Remote admin credential unusable, using local copy");
                }
                Ok(None) => tracing::debug!("Admin credential not stored remotely"),
                Err(e) => log_remote_failure("get_config_value", &e),
            }
        }

        Ok(self
            .cache
            .get(CacheKey::AdminCredential)
            .await?
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_admin_credential.clone()))
    }

    /// Save the credential locally, then try the remote
    pub async fn update_admin_credential(&self, credential: &str) -> SyncResult<bool> {
        if credential.is_empty() {
            return Err(SyncError::InvalidInput("Admin credential must not be empty".to_string()));
        }

        let _guard = self.credential_lock.lock().await;
        self.cache.set(CacheKey::AdminCredential, credential).await?;

        let Some(remote) = &self.remote else {
            return Ok(true);
        };

        let value = serde_json::Value::String(credential.to_string());
        match self
            .remote_call("set_config_value", remote.set_config_value(ADMIN_CREDENTIAL_KEY, value))
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                log_remote_failure("set_config_value", &e);
                Ok(false)
            }
        }
    }

    // ------------------------------------------------------------------

    /// Merge records and fetch both reference lists concurrently
    pub async fn refresh_all(&self) -> SyncResult<HubSnapshot> {
        let (records, vouchers, pharmacies) = tokio::join!(
            self.fetch_and_merge_master(),
            self.fetch_reference_list(ReferenceListKind::Voucher),
            self.fetch_reference_list(ReferenceListKind::Pharmacy),
        );

        Ok(HubSnapshot {
            records: records?,
            vouchers: vouchers?,
            pharmacies: pharmacies?,
        })
    }

    async fn remote_call<T, F>(&self, operation: &'static str, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Unavailable(format!(
                "{} timed out after {:?}",
                operation, self.remote_timeout
            ))),
        }
    }

    async fn load_records(&self) -> SyncResult<Vec<RedemptionRecord>> {
        Ok(get_json(self.cache.as_ref(), CacheKey::Records)
            .await?
            .unwrap_or_default())
    }

    async fn store_records(&self, records: &[RedemptionRecord]) -> SyncResult<()> {
        set_json(self.cache.as_ref(), CacheKey::Records, records).await
    }

    async fn mark_backup(&self) -> SyncResult<()> {
        self.cache
            .set(CacheKey::LastBackup, &Utc::now().to_rfc3339())
            .await
    }
}

/// Merge cached records with the remote set.
///
/// Remote rows win on equal `id`; only pending local records the remote does
/// not know survive, ahead of the remote rows. Duplicate ids collapse to
/// their first occurrence.
pub fn merge_master(
    local: Vec<RedemptionRecord>,
    remote_rows: Vec<RemoteRow>,
) -> Vec<RedemptionRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(remote_rows.len());
    let remote: Vec<RedemptionRecord> = remote_rows
        .into_iter()
        .filter(|row| seen.insert(row.id.clone()))
        .map(RedemptionRecord::from_remote)
        .collect();

    let mut merged: Vec<RedemptionRecord> = local
        .into_iter()
        .filter(|r| r.is_pending())
        .filter(|r| seen.insert(r.id.clone()))
        .collect();

    merged.extend(remote);
    merged
}

/// Accept a JSON array of strings, or a string holding one
fn parse_list_value(value: serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::String(raw) => serde_json::from_str(&raw).ok(),
        other => serde_json::from_value(other).ok(),
    }
}

/// Render a stored credential as plain text.
///
/// Non-string JSON is rendered to its text and one layer of surrounding
/// quotes is stripped. Empty values and `undefined` are unusable.
pub fn normalize_credential(value: &serde_json::Value) -> Option<String> {
    let raw = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&raw);

    if unquoted.is_empty() || unquoted == "undefined" {
        None
    } else {
        Some(unquoted.to_string())
    }
}

fn log_remote_failure(operation: &str, error: &RemoteError) {
    tracing::warn!(
        operation,
        unreachable = error.is_unreachable(),
        error = %redact(&error.to_string()),
        "Remote call failed, falling back to local cache"
    );
}
