//! Common error handling for Voucher Hub front ends
//!
//! Wraps engine, logging, and usage failures into one [`HubError`] with a
//! stable error code and a process exit status.
//!
//! # Example
//!
//! ```rust,no_run
//! use error_common::{log_error, HubError};
//!
//! fn run() -> Result<(), HubError> {
//!     Err(HubError::usage("wipe requires --yes"))
//! }
//!
//! if let Err(e) = run() {
//!     log_error("wipe", &e);
//!     std::process::exit(i32::from(e.exit_code()));
//! }
//! ```

pub mod codes;
pub mod types;

pub use types::*;
