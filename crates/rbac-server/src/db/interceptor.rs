//! Write interception
//!
//! [`super::AuditedDb`] invokes every registered [`WriteInterceptor`] around
//! each create, update and delete it executes:
//!
//! ```text
//! before_update(op) -> UPDATE ... RETURNING * -> after_update(op)
//! ```
//!
//! The before hook runs strictly before the statement and the after hook only
//! once the statement succeeded. Both receive the same [`Operation`], which
//! carries state staged by the before hook into the after hook and is dropped
//! when the statement completes.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::{fmt, sync::Arc};

use super::entity::Entity;
use crate::context::AuditContext;

/// Kind of write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

/// Visibility of soft-deleted rows when reloading a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadScope {
    /// Only rows that are not soft-deleted
    Live,
    /// Every row, soft-deleted or not
    Unscoped,
}

/// Reads the persisted state of the records a statement is about to touch
#[async_trait]
pub trait PriorStateLoader: Send + Sync {
    /// Serialized state of record `id`, `None` when nothing matches
    async fn load(&self, id: i64, scope: LoadScope) -> Result<Option<JsonValue>, sqlx::Error>;
}

/// Description of one write statement, as seen by interceptors
pub struct WriteStatement {
    /// Target table
    pub table: &'static str,
    pub kind: WriteKind,
    /// Declared primary key of the in-memory record, when one is known
    pub primary_key: Option<i64>,
    /// Key values bound into the statement's WHERE clause or VALUES list
    pub params: Vec<i64>,
    /// Serialized in-memory record; the written rows once the statement succeeded
    pub record: Option<JsonValue>,
    /// Reader for the rows the statement will modify or remove
    pub loader: Option<Arc<dyn PriorStateLoader>>,
}

impl WriteStatement {
    pub fn new(table: &'static str, kind: WriteKind) -> Self {
        Self {
            table,
            kind,
            primary_key: None,
            params: Vec::new(),
            record: None,
            loader: None,
        }
    }

    /// Statement targeting the table of `T`
    pub fn for_entity<T: Entity>(kind: WriteKind) -> Self {
        Self::new(T::TABLE, kind)
    }

    pub fn param(mut self, value: i64) -> Self {
        self.params.push(value);
        self
    }

    pub fn params(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.params.extend(values);
        self
    }

    pub fn primary_key(mut self, id: i64) -> Self {
        self.primary_key = Some(id);
        self
    }

    pub fn record(mut self, record: JsonValue) -> Self {
        self.record = Some(record);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn PriorStateLoader>) -> Self {
        self.loader = Some(loader);
        self
    }
}

impl fmt::Debug for WriteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteStatement")
            .field("table", &self.table)
            .field("kind", &self.kind)
            .field("primary_key", &self.primary_key)
            .field("params", &self.params)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

/// One in-flight write: the statement, who issued it, and staged state
#[derive(Debug)]
pub struct Operation<'a> {
    pub statement: WriteStatement,
    pub context: &'a AuditContext,
    prior_state: Option<String>,
}

impl<'a> Operation<'a> {
    pub fn new(statement: WriteStatement, context: &'a AuditContext) -> Self {
        Self {
            statement,
            context,
            prior_state: None,
        }
    }

    /// Stage the serialized pre-write state for the after hook
    pub fn stage_prior_state(&mut self, state: String) {
        self.prior_state = Some(state);
    }

    pub fn take_prior_state(&mut self) -> Option<String> {
        self.prior_state.take()
    }
}

/// Hooks invoked around every write issued through [`super::AuditedDb`]
///
/// Hooks cannot fail the write: they return nothing and must handle their
/// own errors.
#[async_trait]
pub trait WriteInterceptor: Send + Sync {
    async fn before_create(&self, _op: &mut Operation<'_>) {}

    async fn after_create(&self, _op: &mut Operation<'_>) {}

    async fn before_update(&self, _op: &mut Operation<'_>) {}

    async fn after_update(&self, _op: &mut Operation<'_>) {}

    async fn before_delete(&self, _op: &mut Operation<'_>) {}

    async fn after_delete(&self, _op: &mut Operation<'_>) {}
}
