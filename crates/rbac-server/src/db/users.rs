//! User persistence

use std::sync::Arc;

use super::{
    assignments::{self, USER_ROLES},
    entity::ById,
    executor::AuditedDb,
    interceptor::{WriteKind, WriteStatement},
    DbError, DbResult,
};
use crate::{
    context::AuditContext,
    models::{Role, User, UserRole},
};

/// Columns for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub nickname: Option<String>,
    pub status: i16,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub status: Option<i16>,
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct UserRepository {
    db: AuditedDb,
}

impl UserRepository {
    pub fn new(db: AuditedDb) -> Self {
        Self { db }
    }

    pub async fn create(&self, ctx: &AuditContext, user: &NewUser) -> DbResult<User> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<User>(WriteKind::Create);

        let created = self
            .db
            .create(ctx, statement, || async move {
                sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (username, email, password_hash, nickname, status)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.nickname)
                .bind(user.status)
                .fetch_optional(pool)
                .await
            })
            .await
            .map_err(|e| DbError::from(e).on_unique(|| DbError::duplicate("User", &user.username)))?;

        created.ok_or_else(|| DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    /// Apply `changes` to a live user; `None` when no live user has this id
    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        changes: &UserChanges,
    ) -> DbResult<Option<User>> {
        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<User>(WriteKind::Update)
            .param(id)
            .loader(Arc::new(ById::<User>::new(pool.clone())));

        self.db
            .update(ctx, statement, || async move {
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users SET
                        email = COALESCE($2, email),
                        nickname = COALESCE($3, nickname),
                        status = COALESCE($4, status),
                        password_hash = COALESCE($5, password_hash),
                        updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(&changes.email)
                .bind(&changes.nickname)
                .bind(changes.status)
                .bind(&changes.password_hash)
                .fetch_optional(pool)
                .await
            })
            .await
            .map_err(|e| {
                DbError::from(e).on_unique(|| {
                    DbError::duplicate("User email", changes.email.as_deref().unwrap_or_default())
                })
            })
    }

    /// Soft-delete a live user and drop their role assignments
    ///
    /// Returns `false` when no live user has this id.
    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> DbResult<bool> {
        if self.find_by_id(id).await?.is_none() {
            return Ok(false);
        }

        assignments::remove::<UserRole>(&self.db, ctx, USER_ROLES, id, None).await?;

        let pool = self.db.pool();
        let statement = WriteStatement::for_entity::<User>(WriteKind::Delete)
            .param(id)
            .loader(Arc::new(ById::<User>::new(pool.clone())));

        let deleted: Option<User> = self
            .db
            .delete(ctx, statement, || async move {
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users SET deleted_at = NOW(), updated_at = NOW()
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

    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(users)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
                .fetch_one(self.db.pool())
                .await?;
        Ok(total)
    }

    pub async fn assign_roles(
        &self,
        ctx: &AuditContext,
        user_id: i64,
        role_ids: &[i64],
    ) -> DbResult<Vec<UserRole>> {
        assignments::assign(&self.db, ctx, USER_ROLES, user_id, role_ids).await
    }

    pub async fn remove_roles(
        &self,
        ctx: &AuditContext,
        user_id: i64,
        role_ids: &[i64],
    ) -> DbResult<Vec<UserRole>> {
        assignments::remove(&self.db, ctx, USER_ROLES, user_id, Some(role_ids)).await
    }

    pub async fn roles_of(&self, user_id: i64) -> DbResult<Vec<Role>> {
        assignments::members_of(self.db.pool(), USER_ROLES, user_id).await
    }
}
