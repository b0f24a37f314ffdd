//! Read access to the change audit
//!
//! Entries are written by [`crate::audit::AuditRecorder`]; this feature only
//! queries them.

pub mod routes;
pub mod service;
pub mod types;

pub use routes::audit_logs_routes;
pub use service::{AuditLogError, AuditLogService};
pub use types::AuditLogQueryParams;
