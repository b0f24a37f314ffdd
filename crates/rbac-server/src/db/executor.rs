//! Audited write execution

use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::{future::Future, sync::Arc};

use super::{
    entity::Entity,
    interceptor::{Operation, WriteInterceptor, WriteKind, WriteStatement},
};
use crate::context::AuditContext;

/// Rows returned by a write statement
pub trait WriteOutput: Send {
    /// Whether the statement touched at least one row
    fn touched(&self) -> bool;

    /// Declared primary key of the written record, for single-record writes
    fn primary_key(&self) -> Option<i64>;

    /// Serialized written rows, `None` if they cannot be serialized
    fn to_json(&self) -> Option<JsonValue>;
}

impl<T: Entity> WriteOutput for Option<T> {
    fn touched(&self) -> bool {
        self.is_some()
    }

    fn primary_key(&self) -> Option<i64> {
        self.as_ref().map(Entity::primary_key)
    }

    fn to_json(&self) -> Option<JsonValue> {
        self.as_ref().and_then(|r| serde_json::to_value(r).ok())
    }
}

impl<T: Serialize + Send> WriteOutput for Vec<T> {
    fn touched(&self) -> bool {
        !self.is_empty()
    }

    fn primary_key(&self) -> Option<i64> {
        None
    }

    fn to_json(&self) -> Option<JsonValue> {
        serde_json::to_value(self).ok()
    }
}

/// Connection pool plus the interceptors every write goes through
///
/// Repositories issue reads directly on [`AuditedDb::pool`] and route every
/// create, update and delete through [`AuditedDb::create`],
/// [`AuditedDb::update`] or [`AuditedDb::delete`].
#[derive(Clone)]
pub struct AuditedDb {
    pool: PgPool,
    interceptors: Arc<Vec<Arc<dyn WriteInterceptor>>>,
}

impl AuditedDb {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            interceptors: Arc::new(Vec::new()),
        }
    }

    /// Register an interceptor; interceptors run in registration order
    pub fn with_interceptor(mut self, interceptor: Arc<dyn WriteInterceptor>) -> Self {
        Arc::make_mut(&mut self.interceptors).push(interceptor);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<O, F, Fut>(
        &self,
        ctx: &AuditContext,
        statement: WriteStatement,
        write: F,
    ) -> Result<O, sqlx::Error>
    where
        O: WriteOutput,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<O, sqlx::Error>> + Send,
    {
        self.execute(WriteKind::Create, ctx, statement, write).await
    }

    pub async fn update<O, F, Fut>(
        &self,
        ctx: &AuditContext,
        statement: WriteStatement,
        write: F,
    ) -> Result<O, sqlx::Error>
    where
        O: WriteOutput,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<O, sqlx::Error>> + Send,
    {
        self.execute(WriteKind::Update, ctx, statement, write).await
    }

    pub async fn delete<O, F, Fut>(
        &self,
        ctx: &AuditContext,
        statement: WriteStatement,
        write: F,
    ) -> Result<O, sqlx::Error>
    where
        O: WriteOutput,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<O, sqlx::Error>> + Send,
    {
        self.execute(WriteKind::Delete, ctx, statement, write).await
    }

    async fn execute<O, F, Fut>(
        &self,
        kind: WriteKind,
        ctx: &AuditContext,
        mut statement: WriteStatement,
        write: F,
    ) -> Result<O, sqlx::Error>
    where
        O: WriteOutput,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<O, sqlx::Error>> + Send,
    {
        statement.kind = kind;
        let mut op = Operation::new(statement, ctx);

        for interceptor in self.interceptors.iter() {
            match kind {
                WriteKind::Create => interceptor.before_create(&mut op).await,
                WriteKind::Update => interceptor.before_update(&mut op).await,
                WriteKind::Delete => interceptor.before_delete(&mut op).await,
            }
        }

        let output = write().await?;

        if !output.touched() {
            tracing::debug!(table = op.statement.table, ?kind, "Write touched no rows");
            return Ok(output);
        }

        if let Some(id) = output.primary_key() {
            op.statement.primary_key = Some(id);
        }
        op.statement.record = output.to_json();

        for interceptor in self.interceptors.iter() {
            match kind {
                WriteKind::Create => interceptor.after_create(&mut op).await,
                WriteKind::Update => interceptor.after_update(&mut op).await,
                WriteKind::Delete => interceptor.after_delete(&mut op).await,
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records the hook sequence it sees
    #[derive(Default)]
    struct Trace {
        calls: Mutex<Vec<String>>,
    }

    impl Trace {
        fn push(&self, hook: &str, op: &Operation<'_>) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}:{:?}", hook, op.statement.table, op.statement.primary_key));
        }
    }

    #[async_trait]
    impl WriteInterceptor for Trace {
        async fn before_create(&self, op: &mut Operation<'_>) {
            self.push("before_create", op);
        }
        async fn after_create(&self, op: &mut Operation<'_>) {
            self.push("after_create", op);
        }
        async fn before_delete(&self, op: &mut Operation<'_>) {
            op.stage_prior_state("staged".to_string());
            self.push("before_delete", op);
        }
        async fn after_delete(&self, op: &mut Operation<'_>) {
            let staged = op.take_prior_state().unwrap_or_default();
            self.push(&format!("after_delete[{}]", staged), op);
        }
    }

    fn lazy_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/rbac_unused")
            .unwrap()
    }

    fn join_row(id: i64) -> UserRole {
        UserRole {
            id,
            user_id: 1,
            role_id: 2,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_hooks_wrap_successful_write() {
        let trace = Arc::new(Trace::default());
        let db = AuditedDb::new(lazy_pool()).with_interceptor(trace.clone());
        let ctx = AuditContext::system();

        let out: Option<UserRole> = db
            .create(&ctx, WriteStatement::for_entity::<UserRole>(WriteKind::Create), || async {
                Ok(Some(join_row(11)))
            })
            .await
            .unwrap();

        assert!(out.is_some());
        assert_eq!(
            *trace.calls.lock().unwrap(),
            vec![
                "before_create:user_roles:None".to_string(),
                "after_create:user_roles:Some(11)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_staged_state_reaches_after_hook() {
        let trace = Arc::new(Trace::default());
        let db = AuditedDb::new(lazy_pool()).with_interceptor(trace.clone());
        let ctx = AuditContext::system();

        let _: Vec<UserRole> = db
            .delete(&ctx, WriteStatement::for_entity::<UserRole>(WriteKind::Delete), || async {
                Ok(vec![join_row(4)])
            })
            .await
            .unwrap();

        let calls = trace.calls.lock().unwrap();
        assert_eq!(calls[1], "after_delete[staged]:user_roles:None");
    }

    #[tokio::test]
    async fn test_failed_write_skips_after_hook() {
        let trace = Arc::new(Trace::default());
        let db = AuditedDb::new(lazy_pool()).with_interceptor(trace.clone());
        let ctx = AuditContext::system();

        let result: Result<Option<UserRole>, _> = db
            .create(&ctx, WriteStatement::for_entity::<UserRole>(WriteKind::Create), || async {
                Err(sqlx::Error::RowNotFound)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(trace.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_untouched_write_skips_after_hook() {
        let trace = Arc::new(Trace::default());
        let db = AuditedDb::new(lazy_pool()).with_interceptor(trace.clone());
        let ctx = AuditContext::system();

        let out: Vec<UserRole> = db
            .create(&ctx, WriteStatement::for_entity::<UserRole>(WriteKind::Create), || async {
                Ok(Vec::new())
            })
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(trace.calls.lock().unwrap().len(), 1);
    }
}
