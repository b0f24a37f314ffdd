//! RBAC Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the RBAC workspace.
//!
//! - **Error Handling**: [`RbacError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber configuration, including the audit log file
//!
//! # Example
//!
//! ```no_run
//! use rbac_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{RbacError, Result};
