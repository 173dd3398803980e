/// Operations CLI for Voucher Hub
///
/// Front end for the sync engine, meant for branch terminals and support
/// staff:
/// - Logging redemptions, with push-on-create and a local pending queue
/// - Manual and background reconciliation with the remote store
/// - Voucher / pharmacy list and admin credential management
/// - Destructive maintenance (remote wipe, local cache reset)
///
/// # Example Usage
///
/// ```bash
/// voucher-hub status
/// voucher-hub record --voucher "Huggies Voucher" --pharmacy "Rayan Main" \
///     --pharmacist-id 101 --phone 0501234567 --lakum new-enrollment --user agent-x1
/// voucher-hub sync
/// voucher-hub pharmacies add "Takhas OB"
/// voucher-hub watch --interval 10
/// ```
pub mod cli;
pub mod commands;
pub mod render;

pub use cli::{Cli, Command};
