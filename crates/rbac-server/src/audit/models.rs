//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Table holding audit entries; writes against it are never audited
pub const AUDIT_TABLE: &str = "audit_logs";

/// Default number of audit entries returned per query
pub const DEFAULT_AUDIT_QUERY_LIMIT: i64 = 100;

/// Maximum number of audit entries that can be returned in a single query.
pub const MAX_AUDIT_QUERY_LIMIT: i64 = 1000;

/// Audit log entry from the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// Assigned at insert, increasing with insertion order
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// Table the audited write targeted
    pub table_name: String,
    /// Primary key of the affected record (the owner id for assignment rows)
    pub record_id: i64,
    /// `create`, `update` or `delete`
    pub action: String,
    /// Serialized state before the write, empty for creates
    pub old_values: String,
    /// Serialized state after the write, empty for deletes
    pub new_values: String,
    /// Acting user, `0` when unknown
    pub user_id: i64,
    /// Client address, empty when unknown
    pub ip: String,
}

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("Unknown audit action '{}'", other)),
        }
    }
}

/// Input for creating an audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub table_name: String,
    pub record_id: i64,
    pub action: AuditAction,
    pub old_values: String,
    pub new_values: String,
    pub user_id: i64,
    pub ip: String,
}

/// Query parameters for audit logs
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    pub table_name: Option<String>,
    pub record_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub user_id: Option<i64>,
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_AUDIT_QUERY_LIMIT
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            table_name: None,
            record_id: None,
            action: None,
            user_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}
