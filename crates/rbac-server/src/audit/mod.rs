//! Change audit
//!
//! Every successful create, update and delete issued through
//! [`crate::db::AuditedDb`] against a table other than `audit_logs` produces one
//! immutable [`AuditEntry`] holding the record's state before and after the
//! write.
//!
//! # Architecture
//!
//! - [`AuditRecorder`] is registered on `AuditedDb` as a write interceptor
//! - prior state is read before the statement on a separate pool connection
//! - entries are appended through an [`AuditSink`] ([`PgAuditSink`] in
//!   production), again on a separate connection
//! - auditing is best effort: failures are logged and never reach the caller
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rbac_server::audit::{AuditRecorder, PgAuditSink};
//! use rbac_server::db::AuditedDb;
//! use sqlx::PgPool;
//!
//! # fn example(pool: PgPool) {
//! let recorder = AuditRecorder::new(Arc::new(PgAuditSink::new(pool.clone())));
//! let db = AuditedDb::new(pool).with_interceptor(Arc::new(recorder));
//! # }
//! ```

mod models;
mod queries;
mod recorder;
mod sink;
pub mod snapshot;

#[cfg(test)]
mod recorder_tests;

pub use models::{
    AuditAction, AuditEntry, AuditQuery, NewAuditEntry, AUDIT_TABLE, DEFAULT_AUDIT_QUERY_LIMIT,
    MAX_AUDIT_QUERY_LIMIT,
};
pub use queries::{
    count_audit_logs, create_audit_entry, get_audit_trail, get_user_audit_logs, query_audit_logs,
};
pub use recorder::AuditRecorder;
pub use sink::{AuditSink, PgAuditSink};
