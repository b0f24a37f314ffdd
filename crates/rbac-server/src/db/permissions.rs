//! Permission persistence

use std::sync::Arc;

use super::{
    assignments::{self, JoinTable},
    entity::ById,
    executor::AuditedDb,
    interceptor::{WriteKind, WriteStatement},
    DbError, DbResult,
};
use crate::{
    context::AuditContext,
    models::{Permission, RolePermission},
};

/// Permission side of `role_permissions`
const PERMISSION_ROLES: JoinTable = JoinTable {
    table: "role_permissions",
    owner_column: "permission_id",
    member_column: "role_id",
    member_table: "roles",
};

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
    pub status: i16,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionChanges {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub status: Option<i16>,
}

/// Optional list filters, matched exactly
#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub resource: Option<String>,
    pub action: Option<String>,
}

#[derive(Clone)]
pub struct PermissionRepository {
    db: AuditedDb,
}

impl PermissionRepository {
    pub fn new(db: AuditedDb) -> Self {
        Self { db }
    }

    pub async fn create(&self, ctx: &AuditContext, permission: &NewPermission) -> DbResult<Permission> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Permission>(WriteKind::Create);

        let created = self
            .db
            .create(ctx, statement, || async move {
                sqlx::query_as::<_, Permission>(
                    r#"
                    INSERT INTO permissions (name, display_name, description, resource, action, status)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING *
                    "#,
                )
                .bind(&permission.name)
                .bind(&permission.display_name)
                .bind(&permission.description)
                .bind(&permission.resource)
                .bind(&permission.action)
                .bind(permission.status)
                .fetch_optional(pool)
                .await
            })
            .await
            .map_err(|e| {
                DbError::from(e).on_unique(|| DbError::duplicate("Permission", &permission.name))
            })?;

        created.ok_or_else(|| DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(permission)
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(permission)
    }

    pub async fn find_by_resource_action(
        &self,
        resource: &str,
        action: &str,
    ) -> DbResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissions
            WHERE resource = $1 AND action = $2 AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(resource)
        .bind(action)
        .fetch_all(self.db.pool())
        .await?;
        Ok(permissions)
    }

    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        changes: &PermissionChanges,
    ) -> DbResult<Option<Permission>> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Permission>(WriteKind::Update)
            .param(id)
            .loader(Arc::new(ById::<Permission>::new(pool.clone())));

        let updated = self
            .db
            .update(ctx, statement, || async move {
                sqlx::query_as::<_, Permission>(
                    r#"
                    UPDATE permissions SET
                        display_name = COALESCE($2, display_name),
                        description = COALESCE($3, description),
                        resource = COALESCE($4, resource),
                        action = COALESCE($5, action),
                        status = COALESCE($6, status),
                        updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(&changes.display_name)
                .bind(&changes.description)
                .bind(&changes.resource)
                .bind(&changes.action)
                .bind(changes.status)
                .fetch_optional(pool)
                .await
            })
            .await?;
        Ok(updated)
    }

    /// Soft-delete a live permission after detaching it from every role
    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> DbResult<bool> {
        if self.find_by_id(id).await?.is_none() {
            return Ok(false);
        }

        assignments::remove::<RolePermission>(&self.db, ctx, PERMISSION_ROLES, id, None).await?;

        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Permission>(WriteKind::Delete)
            .param(id)
            .loader(Arc::new(ById::<Permission>::new(pool.clone())));

        let deleted: Option<Permission> = self
            .db
            .delete(ctx, statement, || async move {
                sqlx::query_as::<_, Permission>(
                    r#"
                    UPDATE permissions SET deleted_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING *
                    "#,
                )
                .bind(id)
                .fetch_optional(pool)
                .await
            })
            .await?;

        Ok(deleted.is_some())
    }

    pub async fn list(
        &self,
        filter: &PermissionFilter,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissions
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR resource = $1)
              AND ($2::TEXT IS NULL OR action = $2)
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.resource)
        .bind(&filter.action)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(permissions)
    }

    pub async fn count(&self, filter: &PermissionFilter) -> DbResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM permissions
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR resource = $1)
              AND ($2::TEXT IS NULL OR action = $2)
            "#,
        )
        .bind(&filter.resource)
        .bind(&filter.action)
        .fetch_one(self.db.pool())
        .await?;
        Ok(total)
    }
}
