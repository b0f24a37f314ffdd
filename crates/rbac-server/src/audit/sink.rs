//! Destinations for audit entries

use async_trait::async_trait;
use sqlx::PgPool;

use super::{models::NewAuditEntry, queries::create_audit_entry};
use crate::db::DbResult;

/// Append-only store for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> DbResult<()>;
}

/// Writes entries to the `audit_logs` table
///
/// Each insert acquires its own connection from the pool, so it commits
/// independently of whatever transaction performed the audited write.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, entry: NewAuditEntry) -> DbResult<()> {
        create_audit_entry(&self.pool, &entry).await.map(|_| ())
    }
}
