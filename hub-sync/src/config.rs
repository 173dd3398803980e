//! Runtime configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional `voucher-hub.{toml,yaml,json}` file
//! 3. `VOUCHER_HUB__<SECTION>__<FIELD>` environment variables
//!
//! The remote store is configured separately from `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY`, matching how deployments inject backend credentials.
//! A `.env` file is honoured for both.

use crate::defaults::DEFAULT_ADMIN_CREDENTIAL;
use crate::error::SyncResult;
use crate::local_cache::LocalCacheConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_PREFIX: &str = "VOUCHER_HUB";
pub const DEFAULT_CONFIG_FILE: &str = "voucher-hub";
pub const REMOTE_URL_VAR: &str = "SUPABASE_URL";
pub const REMOTE_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Shortest configurable remote timeout; zero would fail every call
pub const MIN_REMOTE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection settings of the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
}

impl RemoteConfig {
    /// Read the remote settings from the process environment
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var(REMOTE_URL_VAR).ok(),
            std::env::var(REMOTE_KEY_VAR).ok(),
        )
    }

    /// Build from raw values; blank values and unexpanded `$VAR`
    /// placeholders count as missing.
    pub fn from_values(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let usable = |v: &String| !v.trim().is_empty() && !v.starts_with('$');
        match (url.filter(usable), anon_key.filter(usable)) {
            (Some(url), Some(anon_key)) => Some(Self { url, anon_key }),
            _ => None,
        }
    }
}

/// Whether a remote store is configured at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    Configured,
    Disconnected,
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::Configured => f.write_str("Configured"),
            RemoteStatus::Disconnected => f.write_str("Disconnected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Upper bound for any single remote call, in seconds
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
    /// Period of the background reconciler, in seconds
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote_timeout_secs: default_remote_timeout(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub cache: LocalCacheConfig,

    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    #[serde(default)]
    pub sync: SyncSettings,

    /// Admin credential used until one is stored locally or remotely
    #[serde(default = "default_admin_credential")]
    pub default_admin_credential: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            cache: LocalCacheConfig::default(),
            remote: None,
            sync: SyncSettings::default(),
            default_admin_credential: default_admin_credential(),
        }
    }
}

impl HubConfig {
    /// Load configuration from file and environment.
    ///
    /// `path` names the config file without extension; when given, the file
    /// must exist.
    pub fn load(path: Option<&str>) -> SyncResult<Self> {
        // A missing .env is the common case
        if let Err(e) = dotenvy::dotenv() {
            tracing::trace!(error = %e, "No .env file loaded");
        }

        let file = ::config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE))
            .required(path.is_some());

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut hub: HubConfig = settings.try_deserialize()?;
        if hub.remote.is_none() {
            hub.remote = RemoteConfig::from_env();
        }

        tracing::debug!(
            db_path = %hub.cache.db_path,
            remote = %hub.remote_status(),
            "Loaded configuration"
        );

        Ok(hub)
    }

    pub fn remote_status(&self) -> RemoteStatus {
        if self.remote.is_some() {
            RemoteStatus::Configured
        } else {
            RemoteStatus::Disconnected
        }
    }

    /// Remote call bound, never below [`MIN_REMOTE_TIMEOUT`]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.remote_timeout_secs).max(MIN_REMOTE_TIMEOUT)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.sync.retry_interval_secs)
    }
}

fn default_remote_timeout() -> u64 {
    15
}

fn default_retry_interval() -> u64 {
    10
}

fn default_admin_credential() -> String {
    DEFAULT_ADMIN_CREDENTIAL.to_string()
}
