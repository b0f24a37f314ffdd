//! RBAC Server Library
//!
//! REST backend managing users, roles and permissions, with a change audit
//! recorded below the repositories.
//!
//! # Overview
//!
//! - **API Endpoints**: CRUD for users, roles and permissions, plus
//!   assignment endpoints for user-role and role-permission links
//! - **Audit**: every insert, update and delete issued through
//!   [`db::AuditedDb`] is captured with before/after snapshots, acting user
//!   and client address, and stored in `audit_logs`
//! - **Middleware**: CORS, tracing spans, request context and access logging
//! - **Configuration**: environment-based, see [`config::Config`]
//!
//! # Architecture
//!
//! Handlers extract an [`context::AuditContext`] (filled in by
//! [`middleware::RequestContextLayer`]) and pass it through the feature
//! services to the repositories. Repositories describe each write with a
//! [`db::WriteStatement`]; the [`audit::AuditRecorder`] registered on the
//! executor turns completed writes into audit entries. Audit failures are
//! logged and never fail the business write.
//!
//! Component wiring lives in [`container::AppContainer`].
//!
//! # Example
//!
//! ```no_run
//! use rbac_server::{api, config::Config, container::AppContainer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let container = AppContainer::build(&config).await?;
//!     api::serve(&config, container, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod container;
pub mod context;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod models;

// Re-export commonly used types
pub use container::AppContainer;
pub use context::AuditContext;
pub use error::AppError;
