//! Role persistence

use std::sync::Arc;

use super::{
    assignments::{self, ROLE_PERMISSIONS, ROLE_USERS},
    entity::ById,
    executor::AuditedDb,
    interceptor::{WriteKind, WriteStatement},
    DbError, DbResult,
};
use crate::{
    context::AuditContext,
    models::{Permission, Role, RolePermission, User, UserRole},
};

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub status: i16,
}

/// Partial update; the role name is immutable
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<i16>,
}

#[derive(Clone)]
pub struct RoleRepository {
    db: AuditedDb,
}

impl RoleRepository {
    pub fn new(db: AuditedDb) -> Self {
        Self { db }
    }

    pub async fn create(&self, ctx: &AuditContext, role: &NewRole) -> DbResult<Role> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Role>(WriteKind::Create);

        let created = self
            .db
            .create(ctx, statement, || async move {
                sqlx::query_as::<_, Role>(
                    r#"
                    INSERT INTO roles (name, display_name, description, status)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *
                    "#,
                )
                .bind(&role.name)
                .bind(&role.display_name)
                .bind(&role.description)
                .bind(role.status)
                .fetch_optional(pool)
                .await
            })
            .await
            .map_err(|e| DbError::from(e).on_unique(|| DbError::duplicate("Role", &role.name)))?;

        created.ok_or_else(|| DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<Role>> {
        let role =
            sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(role)
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Role>> {
        let role =
            sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1 AND deleted_at IS NULL")
                .bind(name)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(role)
    }

    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        changes: &RoleChanges,
    ) -> DbResult<Option<Role>> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Role>(WriteKind::Update)
            .param(id)
            .loader(Arc::new(ById::<Role>::new(pool.clone())));

        let updated = self
            .db
            .update(ctx, statement, || async move {
                sqlx::query_as::<_, Role>(
                    r#"
                    UPDATE roles SET
                        display_name = COALESCE($2, display_name),
                        description = COALESCE($3, description),
                        status = COALESCE($4, status),
                        updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(&changes.display_name)
                .bind(&changes.description)
                .bind(changes.status)
                .fetch_optional(pool)
                .await
            })
            .await?;
        Ok(updated)
    }

    /// Soft-delete a live role after removing its user and permission assignments
    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> DbResult<bool> {
        if self.find_by_id(id).await?.is_none() {
            return Ok(false);
        }

        assignments::remove::<RolePermission>(&self.db, ctx, ROLE_PERMISSIONS, id, None).await?;
        assignments::remove::<UserRole>(&self.db, ctx, ROLE_USERS, id, None).await?;

        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<Role>(WriteKind::Delete)
            .param(id)
            .loader(Arc::new(ById::<Role>::new(pool.clone())));

        let deleted: Option<Role> = self
            .db
            .delete(ctx, statement, || async move {
                sqlx::query_as::<_, Role>(
                    r#"
                    UPDATE roles SET deleted_at = NOW(), updated_at = NOW()
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

    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE deleted_at IS NULL
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(roles)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL")
                .fetch_one(self.db.pool())
                .await?;
        Ok(total)
    }

    pub async fn assign_permissions(
        &self,
        ctx: &AuditContext,
        role_id: i64,
        permission_ids: &[i64],
    ) -> DbResult<Vec<RolePermission>> {
        assignments::assign(&self.db, ctx, ROLE_PERMISSIONS, role_id, permission_ids).await
    }

    pub async fn remove_permissions(
        &self,
        ctx: &AuditContext,
        role_id: i64,
        permission_ids: &[i64],
    ) -> DbResult<Vec<RolePermission>> {
        assignments::remove(&self.db, ctx, ROLE_PERMISSIONS, role_id, Some(permission_ids)).await
    }

    pub async fn permissions_of(&self, role_id: i64) -> DbResult<Vec<Permission>> {
        assignments::members_of(self.db.pool(), ROLE_PERMISSIONS, role_id).await
    }

    pub async fn assign_users(
        &self,
        ctx: &AuditContext,
        role_id: i64,
        user_ids: &[i64],
    ) -> DbResult<Vec<UserRole>> {
        assignments::assign(&self.db, ctx, ROLE_USERS, role_id, user_ids).await
    }

    pub async fn remove_users(
        &self,
        ctx: &AuditContext,
        role_id: i64,
        user_ids: &[i64],
    ) -> DbResult<Vec<UserRole>> {
        assignments::remove(&self.db, ctx, ROLE_USERS, role_id, Some(user_ids)).await
    }

    pub async fn users_of(&self, role_id: i64) -> DbResult<Vec<User>> {
        assignments::members_of(self.db.pool(), ROLE_USERS, role_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{
        audit_entries, audited_db, TestPermission, TestUser,
    };
    use serde_json::Value;
    use sqlx::PgPool;

    fn new_role(name: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            description: String::new(),
            status: 1,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_create_and_find(pool: PgPool) -> sqlx::Result<()> {
        let repo = RoleRepository::new(audited_db(&pool));
        let ctx = AuditContext::system();

        let role = repo.create(&ctx, &new_role("editor")).await.unwrap();
        let found = repo.find_by_name("editor").await.unwrap().unwrap();
        assert_eq!(found.id, role.id);
        assert_eq!(found.display_name, "EDITOR");
        assert_eq!(repo.count().await.unwrap(), 1);

        let err = repo.create(&ctx, &new_role("editor")).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_partial_update_keeps_other_fields(pool: PgPool) -> sqlx::Result<()> {
        let repo = RoleRepository::new(audited_db(&pool));
        let ctx = AuditContext::system();
        let role = repo.create(&ctx, &new_role("ops")).await.unwrap();

        let changes = RoleChanges {
            status: Some(0),
            ..Default::default()
        };
        let updated = repo.update(&ctx, role.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.status, 0);
        assert_eq!(updated.display_name, "OPS");

        let entries = audit_entries(&pool, "roles").await;
        assert_eq!(entries.len(), 2);
        let old: Value = serde_json::from_str(&entries[1].old_values).unwrap();
        let new: Value = serde_json::from_str(&entries[1].new_values).unwrap();
        assert_eq!(old["status"], 1);
        assert_eq!(new["status"], 0);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_delete_removes_assignments(pool: PgPool) -> sqlx::Result<()> {
        let repo = RoleRepository::new(audited_db(&pool));
        let ctx = AuditContext::system();
        let role = repo.create(&ctx, &new_role("auditor")).await.unwrap();
        let user = TestUser::new("frank").insert(&pool).await?;
        let permission = TestPermission::new("user:read").insert(&pool).await?;

        repo.assign_users(&ctx, role.id, &[user.id]).await.unwrap();
        repo.assign_permissions(&ctx, role.id, &[permission.id]).await.unwrap();
        assert_eq!(repo.users_of(role.id).await.unwrap().len(), 1);
        assert_eq!(repo.permissions_of(role.id).await.unwrap()[0].name, "user:read");

        assert!(repo.delete(&ctx, role.id).await.unwrap());
        assert!(repo.find_by_id(role.id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM user_roles) + (SELECT COUNT(*) FROM role_permissions)",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(remaining, 0);

        let role_entries = audit_entries(&pool, "roles").await;
        assert_eq!(role_entries.last().unwrap().action, "delete");
        let joins = audit_entries(&pool, "role_permissions").await;
        assert_eq!(joins.iter().filter(|e| e.action == "delete").count(), 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_deleted_permissions_are_not_assigned(pool: PgPool) -> sqlx::Result<()> {
        let repo = RoleRepository::new(audited_db(&pool));
        let ctx = AuditContext::system();
        let role = repo.create(&ctx, &new_role("reader")).await.unwrap();
        let live = TestPermission::new("role:read").insert(&pool).await?;
        let gone = TestPermission::new("role:write").deleted().insert(&pool).await?;

        let rows = repo.assign_permissions(&ctx, role.id, &[live.id, gone.id]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].permission_id, live.id);

        // Removing nothing writes no audit entry
        let removed = repo.remove_permissions(&ctx, role.id, &[gone.id]).await.unwrap();
        assert!(removed.is_empty());
        let entries = audit_entries(&pool, "role_permissions").await;
        assert_eq!(entries.len(), 1);

        Ok(())
    }
}
