//! Many-to-many assignment rows (`user_roles`, `role_permissions`)
//!
//! Assignment writes touch a set of rows at once. They are audited as one
//! entry on the join table whose record id is the owner (the first bound key)
//! and whose state is the JSON array of rows inserted or removed.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::{marker::PhantomData, sync::Arc};

use super::{
    entity::Entity,
    executor::AuditedDb,
    interceptor::{LoadScope, PriorStateLoader, WriteKind, WriteStatement},
    DbResult,
};
use crate::context::AuditContext;

/// One direction of a join table
#[derive(Debug, Clone, Copy)]
pub struct JoinTable {
    pub table: &'static str,
    /// Column holding the id of the side that owns the assignment
    pub owner_column: &'static str,
    /// Column holding the assigned ids
    pub member_column: &'static str,
    /// Table the assigned ids reference
    pub member_table: &'static str,
}

pub const USER_ROLES: JoinTable = JoinTable {
    table: "user_roles",
    owner_column: "user_id",
    member_column: "role_id",
    member_table: "roles",
};

pub const ROLE_USERS: JoinTable = JoinTable {
    table: "user_roles",
    owner_column: "role_id",
    member_column: "user_id",
    member_table: "users",
};

pub const ROLE_PERMISSIONS: JoinTable = JoinTable {
    table: "role_permissions",
    owner_column: "role_id",
    member_column: "permission_id",
    member_table: "permissions",
};

impl JoinTable {
    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {table} ({owner}, {member}) \
             SELECT $1, m.id FROM {members} m \
             WHERE m.id = ANY($2) AND m.deleted_at IS NULL \
             ORDER BY m.id \
             ON CONFLICT ({owner}, {member}) DO NOTHING \
             RETURNING *",
            table = self.table,
            owner = self.owner_column,
            member = self.member_column,
            members = self.member_table,
        )
    }

    fn delete_sql(&self, scoped_to_members: bool) -> String {
        if scoped_to_members {
            format!(
                "DELETE FROM {} WHERE {} = $1 AND {} = ANY($2) RETURNING *",
                self.table, self.owner_column, self.member_column
            )
        } else {
            format!("DELETE FROM {} WHERE {} = $1 RETURNING *", self.table, self.owner_column)
        }
    }

    fn select_sql(&self, scoped_to_members: bool) -> String {
        if scoped_to_members {
            format!(
                "SELECT * FROM {} WHERE {} = $1 AND {} = ANY($2) ORDER BY id",
                self.table, self.owner_column, self.member_column
            )
        } else {
            format!("SELECT * FROM {} WHERE {} = $1 ORDER BY id", self.table, self.owner_column)
        }
    }

    fn members_sql(&self) -> String {
        format!(
            "SELECT m.* FROM {members} m \
             JOIN {table} j ON j.{member} = m.id \
             WHERE j.{owner} = $1 AND m.deleted_at IS NULL \
             ORDER BY m.id",
            members = self.member_table,
            table = self.table,
            member = self.member_column,
            owner = self.owner_column,
        )
    }
}

/// Loads the assignment rows a removal is about to delete
pub struct JoinRows<T> {
    pool: PgPool,
    join: JoinTable,
    member_ids: Option<Vec<i64>>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Entity> JoinRows<T> {
    pub fn new(pool: PgPool, join: JoinTable, member_ids: Option<Vec<i64>>) -> Self {
        Self {
            pool,
            join,
            member_ids,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> PriorStateLoader for JoinRows<T> {
    // Assignment rows are hard-deleted, so the scope makes no difference
    async fn load(&self, owner_id: i64, _scope: LoadScope) -> Result<Option<JsonValue>, sqlx::Error> {
        let sql = self.join.select_sql(self.member_ids.is_some());
        let mut query = sqlx::query_as::<_, T>(&sql).bind(owner_id);
        if let Some(ref member_ids) = self.member_ids {
            query = query.bind(member_ids);
        }

        let rows = query.fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(serde_json::to_value(&rows).ok())
    }
}

/// Insert assignments for live members not already assigned
///
/// Returns the rows actually inserted.
pub async fn assign<T: Entity>(
    db: &AuditedDb,
    ctx: &AuditContext,
    join: JoinTable,
    owner_id: i64,
    member_ids: &[i64],
) -> DbResult<Vec<T>> {
    let pool = db.pool();
    let sql = join.insert_sql();
    let statement = WriteStatement::new(join.table, WriteKind::Create)
        .param(owner_id)
        .params(member_ids.iter().copied());

    let rows = db
        .create(ctx, statement, || async move {
            sqlx::query_as::<_, T>(&sql)
                .bind(owner_id)
                .bind(member_ids)
                .fetch_all(pool)
                .await
        })
        .await?;

    tracing::debug!(
        table = join.table,
        owner_id,
        inserted = rows.len(),
        "Assignments inserted"
    );

    Ok(rows)
}

/// Remove assignments of `member_ids`, or every assignment of the owner when `None`
///
/// Returns the rows removed.
pub async fn remove<T: Entity>(
    db: &AuditedDb,
    ctx: &AuditContext,
    join: JoinTable,
    owner_id: i64,
    member_ids: Option<&[i64]>,
) -> DbResult<Vec<T>> {
    let pool = db.pool();
    let sql = join.delete_sql(member_ids.is_some());
    let loader = JoinRows::<T>::new(pool.clone(), join, member_ids.map(<[i64]>::to_vec));
    let statement = WriteStatement::new(join.table, WriteKind::Delete)
        .param(owner_id)
        .params(member_ids.unwrap_or_default().iter().copied())
        .loader(Arc::new(loader));

    let rows = db
        .delete(ctx, statement, || async move {
            let mut query = sqlx::query_as::<_, T>(&sql).bind(owner_id);
            if let Some(member_ids) = member_ids {
                query = query.bind(member_ids);
            }
            query.fetch_all(pool).await
        })
        .await?;

    tracing::debug!(
        table = join.table,
        owner_id,
        removed = rows.len(),
        "Assignments removed"
    );

    Ok(rows)
}

/// Live members assigned to `owner_id`
pub async fn members_of<M: Entity>(pool: &PgPool, join: JoinTable, owner_id: i64) -> DbResult<Vec<M>> {
    let members = sqlx::query_as::<_, M>(&join.members_sql())
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    Ok(members)
}
