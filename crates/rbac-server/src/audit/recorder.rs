//! Change-audit recorder
//!
//! [`AuditRecorder`] is a [`WriteInterceptor`] that appends one audit entry
//! per successful create, update or delete issued through
//! [`crate::db::AuditedDb`]:
//!
//! - before update/delete it loads the record's current state through the
//!   statement's [`crate::db::PriorStateLoader`] and stages it on the operation
//! - after the write it pairs the staged state with the written rows and
//!   hands the entry to its [`AuditSink`]
//!
//! Nothing in here can fail the write being observed. Lookup, serialization
//! and sink failures are logged and the entry degrades (empty state) or is
//! dropped.

use async_trait::async_trait;
use rbac_common::logging::AUDIT_TARGET;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    models::{AuditAction, NewAuditEntry, AUDIT_TABLE},
    sink::AuditSink,
    snapshot,
};
use crate::db::{LoadScope, Operation, WriteInterceptor, WriteStatement};

/// Records before/after snapshots of every audited write
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Primary key of the record a statement affects
    ///
    /// First match wins: the record's declared primary key, then the first
    /// positive bound key parameter, then an `id` field on the serialized
    /// record. Zero and negative values never match.
    pub fn resolve_record_id(statement: &WriteStatement) -> Option<i64> {
        statement
            .primary_key
            .filter(|id| *id > 0)
            .or_else(|| statement.params.iter().copied().find(|id| *id > 0))
            .or_else(|| statement.record.as_ref().and_then(snapshot::id_field))
    }

    async fn stage_prior_state(&self, op: &mut Operation<'_>) {
        if op.statement.table == AUDIT_TABLE {
            return;
        }
        let Some(record_id) = Self::resolve_record_id(&op.statement) else {
            return;
        };
        let Some(loader) = op.statement.loader.clone() else {
            return;
        };

        match loader.load(record_id, LoadScope::Live).await {
            Ok(Some(state)) => op.stage_prior_state(snapshot::encode(&state)),
            Ok(None) => {
                debug!(table = op.statement.table, record_id, "No prior state to stage");
            },
            Err(e) => {
                warn!(
                    table = op.statement.table,
                    record_id,
                    error = %e,
                    "Failed to load prior state"
                );
            },
        }
    }

    /// Staged prior state, or a reload that ignores soft deletion
    async fn prior_state(&self, op: &mut Operation<'_>, record_id: i64) -> String {
        if let Some(state) = op.take_prior_state() {
            return state;
        }
        let Some(loader) = op.statement.loader.clone() else {
            return String::new();
        };

        match loader.load(record_id, LoadScope::Unscoped).await {
            Ok(state) => snapshot::encode_opt(state.as_ref()),
            Err(e) => {
                warn!(
                    table = op.statement.table,
                    record_id,
                    error = %e,
                    "Failed to reload prior state"
                );
                String::new()
            },
        }
    }

    async fn append(&self, op: &Operation<'_>, entry: NewAuditEntry) {
        let table = op.statement.table;
        let record_id = entry.record_id;
        let action = entry.action;

        match self.sink.append(entry).await {
            Ok(()) => {
                info!(
                    target: AUDIT_TARGET,
                    table,
                    record_id,
                    action = %action,
                    user_id = op.context.recorded_user_id(),
                    "Audit entry recorded"
                );
            },
            Err(e) => {
                error!(
                    target: AUDIT_TARGET,
                    table,
                    record_id,
                    action = %action,
                    error = %e,
                    "Failed to write audit entry"
                );
            },
        }
    }

    fn entry(
        op: &Operation<'_>,
        record_id: i64,
        action: AuditAction,
        old_values: String,
        new_values: String,
    ) -> NewAuditEntry {
        NewAuditEntry {
            table_name: op.statement.table.to_string(),
            record_id,
            action,
            old_values,
            new_values,
            user_id: op.context.recorded_user_id(),
            ip: op.context.recorded_ip(),
        }
    }
}

#[async_trait]
impl WriteInterceptor for AuditRecorder {
    async fn after_create(&self, op: &mut Operation<'_>) {
        if op.statement.table == AUDIT_TABLE {
            return;
        }
        let Some(record_id) = Self::resolve_record_id(&op.statement) else {
            debug!(table = op.statement.table, "Create not audited: no record id");
            return;
        };

        let new_values = snapshot::encode_opt(op.statement.record.as_ref());
        let entry = Self::entry(op, record_id, AuditAction::Create, String::new(), new_values);
        self.append(op, entry).await;
    }

    async fn before_update(&self, op: &mut Operation<'_>) {
        self.stage_prior_state(op).await;
    }

    async fn after_update(&self, op: &mut Operation<'_>) {
        if op.statement.table == AUDIT_TABLE {
            return;
        }
        let Some(record_id) = Self::resolve_record_id(&op.statement) else {
            debug!(table = op.statement.table, "Update not audited: no record id");
            return;
        };

        let old_values = self.prior_state(op, record_id).await;
        let new_values = snapshot::encode_opt(op.statement.record.as_ref());
        let entry = Self::entry(op, record_id, AuditAction::Update, old_values, new_values);
        self.append(op, entry).await;
    }

    async fn before_delete(&self, op: &mut Operation<'_>) {
        self.stage_prior_state(op).await;
    }

    async fn after_delete(&self, op: &mut Operation<'_>) {
        if op.statement.table == AUDIT_TABLE {
            return;
        }
        let Some(record_id) = Self::resolve_record_id(&op.statement) else {
            debug!(table = op.statement.table, "Delete not audited: no record id");
            return;
        };

        let old_values = self.prior_state(op, record_id).await;
        let entry = Self::entry(op, record_id, AuditAction::Delete, old_values, String::new());
        self.append(op, entry).await;
    }
}
