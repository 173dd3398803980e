//! Redemption record model and the remote field mapping
//!
//! Provides:
//! - [`RedemptionRecord`], the unit of synchronization
//! - [`NewRedemption`], the creator-supplied part of a record
//! - [`RemoteRow`], the snake_case shape stored in the remote table
//! - [`ReferenceListKind`] for the administrator-editable lists

use crate::error::{SyncError, SyncResult};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of client-generated record ids
pub const RECORD_ID_PREFIX: &str = "REC";

const ID_SUFFIX_LEN: usize = 5;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Loyalty ("Lakum") programme status of the redeeming customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LakumStatus {
    #[serde(rename = "New Enrollment")]
    NewEnrollment,
    #[serde(rename = "Has account")]
    HasAccount,
}

impl LakumStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LakumStatus::NewEnrollment => "New Enrollment",
            LakumStatus::HasAccount => "Has account",
        }
    }

    pub fn parse(s: &str) -> SyncResult<Self> {
        match s {
            "New Enrollment" | "new-enrollment" | "NEW_ENROLLMENT" => {
                Ok(LakumStatus::NewEnrollment)
            }
            "Has account" | "has-account" | "HAS_ACCOUNT" => Ok(LakumStatus::HasAccount),
            _ => Err(SyncError::InvalidInput(format!("Unknown lakum status: {}", s))),
        }
    }
}

impl std::fmt::Display for LakumStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes supplied by whoever logs a redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRedemption {
    pub voucher_name: String,
    pub pharmacy_name: String,
    pub pharmacist_id: String,
    pub customer_phone_number: String,
    pub lakum_status: LakumStatus,
    /// Calendar date of the redemption, `YYYY-MM-DD`
    pub date: String,
    pub user_id: String,
}

/// One logged voucher redemption
///
/// Persisted in the local cache in this camelCase shape. `is_synced` never
/// crosses the remote boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    pub id: String,
    pub voucher_name: String,
    pub pharmacy_name: String,
    pub pharmacist_id: String,
    pub customer_phone_number: String,
    pub lakum_status: LakumStatus,
    pub date: String,
    /// Creation instant, milliseconds since epoch
    pub timestamp: i64,
    pub user_id: String,
    #[serde(default)]
    pub is_synced: bool,
}

impl RedemptionRecord {
    /// Stamp a new record with a fresh id and the current time.
    ///
    /// The record starts out pending.
    pub fn create(draft: NewRedemption) -> SyncResult<Self> {
        validate_date(&draft.date)?;
        let timestamp = Utc::now().timestamp_millis();

        Ok(Self {
            id: generate_record_id(timestamp),
            voucher_name: draft.voucher_name,
            pharmacy_name: draft.pharmacy_name,
            pharmacist_id: draft.pharmacist_id,
            customer_phone_number: draft.customer_phone_number,
            lakum_status: draft.lakum_status,
            date: draft.date,
            timestamp,
            user_id: draft.user_id,
            is_synced: false,
        })
    }

    pub fn is_pending(&self) -> bool {
        !self.is_synced
    }

    /// Convert a remote row into a record confirmed present remotely
    pub fn from_remote(row: RemoteRow) -> Self {
        Self {
            id: row.id,
            voucher_name: row.voucher_name,
            pharmacy_name: row.pharmacy_name,
            pharmacist_id: row.pharmacist_id,
            customer_phone_number: row.customer_phone_number,
            lakum_status: row.lakum_status,
            date: row.date,
            timestamp: row.timestamp,
            user_id: row.user_id,
            is_synced: true,
        }
    }

    pub fn to_remote(&self) -> RemoteRow {
        RemoteRow::from(self)
    }
}

/// Row shape of the remote `voucher_entries` table
///
/// Text columns other than `id` read `null` or missing as empty and numbers
/// as their decimal text; rows written by older clients are not always clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub voucher_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pharmacy_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pharmacist_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer_phone_number: String,
    pub lakum_status: LakumStatus,
    pub timestamp: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub user_id: String,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl From<&RedemptionRecord> for RemoteRow {
    fn from(record: &RedemptionRecord) -> Self {
        Self {
            id: record.id.clone(),
            voucher_name: record.voucher_name.clone(),
            date: record.date.clone(),
            pharmacy_name: record.pharmacy_name.clone(),
            pharmacist_id: record.pharmacist_id.clone(),
            customer_phone_number: record.customer_phone_number.clone(),
            lakum_status: record.lakum_status,
            timestamp: record.timestamp,
            user_id: record.user_id.clone(),
        }
    }
}

impl From<RemoteRow> for RedemptionRecord {
    fn from(row: RemoteRow) -> Self {
        RedemptionRecord::from_remote(row)
    }
}

/// Administrator-editable reference list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceListKind {
    Voucher,
    Pharmacy,
}

impl ReferenceListKind {
    /// Key of the list in the remote config table
    pub fn remote_key(&self) -> &'static str {
        match self {
            ReferenceListKind::Voucher => "voucher_list",
            ReferenceListKind::Pharmacy => "pharmacy_list",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceListKind::Voucher => "voucher",
            ReferenceListKind::Pharmacy => "pharmacy",
        }
    }
}

/// `REC-<millis>-<5 base-36 chars>`
pub fn generate_record_id(timestamp_millis: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();
    format!("{}-{}-{}", RECORD_ID_PREFIX, timestamp_millis, suffix)
}

fn validate_date(date: &str) -> SyncResult<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| SyncError::InvalidInput(format!("Invalid date {:?}: {}", date, e)))
}
