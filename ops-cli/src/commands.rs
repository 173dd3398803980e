//! Command execution
//!
//! Each handler drives one engine operation and prints a short summary to
//! stdout. Logs go to stderr.

use crate::cli::{Command, ListCommand, PasswordCommand, RecordArgs};
use crate::render;
use colored::*;
use error_common::{HubError, Result};
use hub_sync::{
    HubConfig, ListUpdate, NewRedemption, RedemptionRecord, Reconciler, ReferenceListKind,
    SyncEngine,
};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(engine: Arc<SyncEngine>, config: &HubConfig, command: Command) -> Result<()> {
    match command {
        Command::Status => status(&engine).await,
        Command::Record(args) => record(&engine, args).await,
        Command::Sync => sync(&engine).await,
        Command::Refresh => refresh(&engine).await,
        Command::List { pending, limit } => list(&engine, pending, limit).await,
        Command::Vouchers(cmd) => reference_list(&engine, ReferenceListKind::Voucher, cmd).await,
        Command::Pharmacies(cmd) => reference_list(&engine, ReferenceListKind::Pharmacy, cmd).await,
        Command::Password(cmd) => password(&engine, cmd).await,
        Command::Wipe { yes } => wipe(&engine, yes).await,
        Command::ClearLocal => clear_local(&engine).await,
        Command::Watch { interval } => {
            let period = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.retry_interval());
            watch(engine, period).await
        }
    }
}

async fn status(engine: &SyncEngine) -> Result<()> {
    let records = engine.cached_records().await?;
    let pending = records.iter().filter(|r| r.is_pending()).count();

    println!("Remote:      {}", render::remote_status(engine.remote_status()));
    println!("Records:     {}", records.len());
    println!("Pending:     {}", pending);
    println!("Last backup: {}", render::last_backup(engine.last_backup().await?));
    Ok(())
}

async fn record(engine: &SyncEngine, args: RecordArgs) -> Result<()> {
    let draft = NewRedemption {
        voucher_name: args.voucher,
        pharmacy_name: args.pharmacy,
        pharmacist_id: args.pharmacist_id,
        customer_phone_number: args.phone,
        lakum_status: args.lakum.into(),
        date: args
            .date
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
        user_id: args.user,
    };

    let record = RedemptionRecord::create(draft)?;
    let id = record.id.clone();

    if engine.create_and_push(record).await? {
        println!("{} {}", "Saved and synced".green(), id);
    } else {
        println!("{} {} (will retry)", "Saved locally".yellow(), id);
    }
    Ok(())
}

async fn sync(engine: &SyncEngine) -> Result<()> {
    let synced = engine.reconcile_pending().await?;
    let remaining = engine.pending_count().await?;
    println!("Synced {} record(s), {} pending", synced, remaining);
    Ok(())
}

async fn refresh(engine: &SyncEngine) -> Result<()> {
    let snapshot = engine.refresh_all().await?;
    let pending = snapshot.records.iter().filter(|r| r.is_pending()).count();
    println!(
        "{} records ({} pending), {} vouchers, {} pharmacies",
        snapshot.records.len(),
        pending,
        snapshot.vouchers.len(),
        snapshot.pharmacies.len()
    );
    Ok(())
}

async fn list(engine: &SyncEngine, pending_only: bool, limit: usize) -> Result<()> {
    let mut records = engine.cached_records().await?;
    if pending_only {
        records.retain(|r| r.is_pending());
    }
    print!("{}", render::record_table(&records, limit));
    if records.is_empty() {
        println!();
    }
    Ok(())
}

async fn reference_list(
    engine: &SyncEngine,
    kind: ReferenceListKind,
    cmd: ListCommand,
) -> Result<()> {
    match cmd {
        ListCommand::Show => {
            let list = engine.fetch_reference_list(kind).await?;
            println!("{}", render::numbered_list(&list));
        }
        ListCommand::Add { name } => {
            let update = engine.add_reference_entry(kind, &name).await?;
            report_list_update(kind, &name, "added", &update);
        }
        ListCommand::Remove { name } => {
            let update = engine.remove_reference_entry(kind, &name).await?;
            report_list_update(kind, &name, "removed", &update);
        }
        ListCommand::Set { names } => {
            let count = names.len();
            let saved = engine.update_reference_list(kind, names).await?;
            println!("Saved {} {} entries{}", count, kind.label(), remote_suffix(saved));
        }
    }
    Ok(())
}

fn report_list_update(kind: ReferenceListKind, name: &str, verb: &str, update: &ListUpdate) {
    if update.changed {
        println!(
            "{} {} {}{}",
            kind.label(),
            name.trim(),
            verb,
            remote_suffix(update.remote_saved.unwrap_or(false))
        );
    } else {
        println!("{} list unchanged", kind.label());
    }
}

fn remote_suffix(saved: bool) -> String {
    if saved {
        String::new()
    } else {
        format!(" {}", "(local only, remote not updated)".yellow())
    }
}

async fn password(engine: &SyncEngine, cmd: PasswordCommand) -> Result<()> {
    match cmd {
        PasswordCommand::Check { candidate } => {
            if engine.fetch_admin_credential().await? == candidate {
                println!("{}", "Credential accepted".green());
                Ok(())
            } else {
                Err(HubError::usage("credential rejected"))
            }
        }
        PasswordCommand::Set { value } => {
            let saved = engine.update_admin_credential(&value).await?;
            println!("Credential updated{}", remote_suffix(saved));
            Ok(())
        }
    }
}

async fn wipe(engine: &SyncEngine, yes: bool) -> Result<()> {
    if !yes {
        if !std::io::stdin().is_terminal() {
            return Err(HubError::usage("refusing to wipe without --yes"));
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Delete ALL redemption records on every device?")
            .default(false)
            .interact()
            .map_err(|e| HubError::Other(e.into()))?;
        if !confirmed {
            return Err(HubError::Aborted("wipe cancelled".to_string()));
        }
    }

    engine.wipe_all().await?;
    println!("{}", "All records deleted".red());
    Ok(())
}

async fn clear_local(engine: &SyncEngine) -> Result<()> {
    let pending = engine.pending_count().await?;
    if pending > 0 {
        tracing::warn!(pending, "Clearing cache with unsynced records");
    }
    engine.clear_local_records().await?;
    println!("Local records cleared ({} were pending)", pending);
    Ok(())
}

async fn watch(engine: Arc<SyncEngine>, period: Duration) -> Result<()> {
    let reconciler = Reconciler::spawn(engine, period);
    println!("Reconciling every {:?}, Ctrl-C to stop", period);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| HubError::Other(e.into()))?;

    reconciler.shutdown().await?;
    Ok(())
}
