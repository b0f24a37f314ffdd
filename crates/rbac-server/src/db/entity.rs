//! Schema metadata for persisted types

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use std::marker::PhantomData;

use super::interceptor::{LoadScope, PriorStateLoader};

/// A persisted record type
///
/// Field enumeration goes through `Serialize`; the constants describe the
/// table the type lives in.
pub trait Entity: Serialize + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Whether deletes set `deleted_at` instead of removing the row
    const SOFT_DELETE: bool = false;

    /// Declared primary key (`id`) of this record
    fn primary_key(&self) -> i64;
}

/// Loads one record of `T` by primary key
///
/// Queries run on a connection drawn from the pool, never on the connection
/// executing the write being audited.
pub struct ById<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> ById<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn sql(scope: LoadScope) -> String {
        if T::SOFT_DELETE && scope == LoadScope::Live {
            format!("SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL", T::TABLE)
        } else {
            format!("SELECT * FROM {} WHERE id = $1", T::TABLE)
        }
    }
}

#[async_trait]
impl<T: Entity> PriorStateLoader for ById<T> {
    async fn load(&self, id: i64, scope: LoadScope) -> Result<Option<JsonValue>, sqlx::Error> {
        let record = sqlx::query_as::<_, T>(&Self::sql(scope))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        // A record that cannot be serialized stages no prior state
        Ok(record.and_then(|r| serde_json::to_value(&r).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRole};

    #[test]
    fn test_scoped_sql_filters_soft_deleted() {
        assert_eq!(
            ById::<User>::sql(LoadScope::Live),
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL"
        );
        assert_eq!(
            ById::<User>::sql(LoadScope::Unscoped),
            "SELECT * FROM users WHERE id = $1"
        );
    }

    #[test]
    fn test_hard_delete_tables_never_filter() {
        assert_eq!(
            ById::<UserRole>::sql(LoadScope::Live),
            "SELECT * FROM user_roles WHERE id = $1"
        );
    }
}
