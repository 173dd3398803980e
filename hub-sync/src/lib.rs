//! Offline-tolerant synchronization engine for the voucher redemption hub
//!
//! Provides:
//! - Local cache (SQLite or in-memory) that survives remote outages
//! - Push-on-create with a pending queue and automatic retry
//! - Pull-and-merge of the remote record set
//! - Read-through / write-through reference lists and admin credential
//! - Background reconciler

pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod local_cache;
pub mod model;
pub mod reconciler;
pub mod remote;

pub use self::config::{HubConfig, RemoteConfig, RemoteStatus, SyncSettings};
pub use engine::{merge_master, normalize_credential, HubSnapshot, ListUpdate, SyncEngine};
pub use error::{RemoteError, RemoteResult, SyncError, SyncResult};
pub use local_cache::{CacheKey, LocalCache, LocalCacheConfig, MemoryCache, SqliteCache};
pub use model::{LakumStatus, NewRedemption, RedemptionRecord, ReferenceListKind, RemoteRow};
pub use reconciler::Reconciler;
pub use remote::{RemoteStore, RestRemoteStore};
