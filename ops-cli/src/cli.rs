use clap::{Args, Parser, Subcommand, ValueEnum};
use hub_sync::LakumStatus;

/// Voucher Hub operations tool
#[derive(Parser, Debug)]
#[command(name = "voucher-hub", version)]
#[command(about = "Log voucher redemptions offline and keep them in sync with the remote store")]
pub struct Cli {
    /// Configuration file path, without extension
    #[arg(short, long, env = "VOUCHER_HUB_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remote connectivity, pending records, last backup
    Status,

    /// Log a redemption and try to push it right away
    Record(RecordArgs),

    /// Push every pending record
    Sync,

    /// Push pending records, then pull and merge everything
    Refresh,

    /// Show cached records
    List {
        /// Only records not yet confirmed by the remote
        #[arg(long)]
        pending: bool,

        /// Maximum number of rows
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Manage the voucher list
    #[command(subcommand)]
    Vouchers(ListCommand),

    /// Manage the pharmacy list
    #[command(subcommand)]
    Pharmacies(ListCommand),

    /// Manage the admin credential
    #[command(subcommand)]
    Password(PasswordCommand),

    /// Delete every record, remotely first
    Wipe {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Forget cached records without touching the remote
    ClearLocal,

    /// Reconcile in the background until interrupted
    Watch {
        /// Seconds between passes; defaults to the configured interval
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[arg(long)]
    pub voucher: String,

    #[arg(long)]
    pub pharmacy: String,

    #[arg(long)]
    pub pharmacist_id: String,

    /// Customer phone number
    #[arg(long)]
    pub phone: String,

    #[arg(long, value_enum)]
    pub lakum: LakumArg,

    /// Redemption date (YYYY-MM-DD), today when omitted
    #[arg(long)]
    pub date: Option<String>,

    /// Identity of whoever logs the redemption
    #[arg(long, env = "VOUCHER_HUB_USER")]
    pub user: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LakumArg {
    NewEnrollment,
    HasAccount,
}

impl From<LakumArg> for LakumStatus {
    fn from(arg: LakumArg) -> Self {
        match arg {
            LakumArg::NewEnrollment => LakumStatus::NewEnrollment,
            LakumArg::HasAccount => LakumStatus::HasAccount,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Print the list
    Show,
    /// Append an entry
    Add { name: String },
    /// Remove an entry
    Remove { name: String },
    /// Replace the whole list
    Set {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Check a candidate against the current credential
    Check { candidate: String },
    /// Replace the credential
    Set { value: String },
}
