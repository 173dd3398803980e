//! Plain-text rendering of engine results

use chrono::{DateTime, Utc};
use colored::*;
use hub_sync::{RedemptionRecord, RemoteStatus};
use logger_redacted::{PiiRedactor, RedactionConfig};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// One line per record, newest first
pub fn record_table(records: &[RedemptionRecord], limit: usize) -> String {
    if records.is_empty() {
        return "No records".to_string();
    }

    let mut out = format!(
        "{:<28} {:<10} {:<22} {:<16} {:<14} {}\n",
        "ID", "DATE", "VOUCHER", "PHARMACY", "CUSTOMER", "STATE"
    );
    for record in records.iter().take(limit) {
        out.push_str(&format!(
            "{:<28} {:<10} {:<22} {:<16} {:<14} {}\n",
            record.id,
            record.date,
            truncate(&record.voucher_name, 22),
            truncate(&record.pharmacy_name, 16),
            masked_phone(&record.customer_phone_number),
            sync_state(record),
        ));
    }
    if records.len() > limit {
        out.push_str(&format!("... {} more\n", records.len() - limit));
    }
    out
}

pub fn sync_state(record: &RedemptionRecord) -> String {
    if record.is_synced {
        "synced".green().to_string()
    } else {
        "pending".yellow().to_string()
    }
}

pub fn remote_status(status: RemoteStatus) -> String {
    match status {
        RemoteStatus::Configured => status.to_string().green().to_string(),
        RemoteStatus::Disconnected => status.to_string().red().to_string(),
    }
}

pub fn last_backup(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(t) => t.format(TIME_FORMAT).to_string(),
        None => "never".to_string(),
    }
}

pub fn numbered_list(entries: &[String]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{:>3}. {}", i + 1, entry))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep the last two digits visible for the person at the counter
fn masked_phone(phone: &str) -> String {
    PiiRedactor::new(RedactionConfig {
        hash_for_correlation: false,
        ..Default::default()
    })
    .mask_phone(phone)
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
