//! Remote store client
//!
//! [`RemoteStore`] is the shape the engine needs from the system of record.
//! [`RestRemoteStore`] implements it against a PostgREST-style gateway in
//! front of two tables:
//! - `voucher_entries`: one row per redemption, primary key `id`
//! - `app_config`: `key`/`value` pairs holding the reference lists and the
//!   admin credential as JSON

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult, SyncError, SyncResult};
use crate::model::RemoteRow;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const RECORDS_TABLE: &str = "voucher_entries";
pub const CONFIG_TABLE: &str = "app_config";

/// Remote system of record
///
/// Every method reports failure as a [`RemoteError`] value; implementations
/// must not panic on network trouble.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// First write of a record; fails if the `id` already exists
    async fn insert(&self, row: &RemoteRow) -> RemoteResult<()>;

    /// Insert-or-update keyed by `id`
    async fn upsert(&self, row: &RemoteRow) -> RemoteResult<()>;

    /// Every record, newest `timestamp` first
    async fn select_all(&self) -> RemoteResult<Vec<RemoteRow>>;

    /// Delete every record
    async fn delete_all(&self) -> RemoteResult<()>;

    /// Raw JSON stored under a config key, `None` if the key is absent
    async fn get_config_value(&self, key: &str) -> RemoteResult<Option<serde_json::Value>>;

    async fn set_config_value(&self, key: &str, value: serde_json::Value) -> RemoteResult<()>;
}

#[derive(Debug, Deserialize)]
struct ConfigRow {
    value: serde_json::Value,
}

/// HTTP client for a PostgREST-compatible backend
pub struct RestRemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRemoteStore {
    /// Build a client for `config`, with every request bounded by `timeout`
    pub fn new(config: &RemoteConfig, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if is_transient(status) {
            return Err(RemoteError::Unavailable(format!(
                "status {}: {}",
                status.as_u16(),
                message
            )));
        }

        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Statuses meaning the backend is down, overloaded or throttling us
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn insert(&self, row: &RemoteRow) -> RemoteResult<()> {
        let request = self
            .request(reqwest::Method::POST, RECORDS_TABLE)
            .header("Prefer", "return=minimal")
            .json(row);

        self.send(request).await?;
        Ok(())
    }

    async fn upsert(&self, row: &RemoteRow) -> RemoteResult<()> {
        let request = self
            .request(reqwest::Method::POST, RECORDS_TABLE)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);

        self.send(request).await?;
        Ok(())
    }

    async fn select_all(&self) -> RemoteResult<Vec<RemoteRow>> {
        let request = self
            .request(reqwest::Method::GET, RECORDS_TABLE)
            .query(&[("select", "*"), ("order", "timestamp.desc")]);

        let response = self.send(request).await?;
        let values: Vec<serde_json::Value> = response.json().await?;
        Ok(decode_rows(values))
    }

    async fn delete_all(&self) -> RemoteResult<()> {
        let request = self
            .request(reqwest::Method::DELETE, RECORDS_TABLE)
            .query(&[("id", "not.is.null")]);

        self.send(request).await?;
        Ok(())
    }

    async fn get_config_value(&self, key: &str) -> RemoteResult<Option<serde_json::Value>> {
        let filter = format!("eq.{}", key);
        let request = self
            .request(reqwest::Method::GET, CONFIG_TABLE)
            .query(&[("select", "value"), ("key", filter.as_str())]);

        let response = self.send(request).await?;
        let rows: Vec<ConfigRow> = response.json().await?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.value)
            .filter(|value| !value.is_null()))
    }

    async fn set_config_value(&self, key: &str, value: serde_json::Value) -> RemoteResult<()> {
        let request = self
            .request(reqwest::Method::POST, CONFIG_TABLE)
            .query(&[("on_conflict", "key")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&serde_json::json!({ "key": key, "value": value }));

        self.send(request).await?;
        Ok(())
    }
}

/// Decode each row on its own so one bad row cannot hide the rest
fn decode_rows(values: Vec<serde_json::Value>) -> Vec<RemoteRow> {
    values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").and_then(|v| v.as_str()).map(str::to_string);
            match serde_json::from_value::<RemoteRow>(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!(id = ?id, error = %e, "Skipping undecodable remote row");
                    None
                }
            }
        })
        .collect()
}
