//! Test helpers and fixtures for database tests
//!
//! Builders insert rows directly, bypassing [`AuditedDb`], so fixtures never
//! show up in the audit log a test inspects.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rbac_server::features::shared::test_helpers::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_something(pool: PgPool) -> sqlx::Result<()> {
//!     let role = TestRole::new("admin").insert(&pool).await?;
//!     let user = TestUser::new("alice").with_status(0).insert(&pool).await?;
//!
//!     // ... test logic ...
//!     Ok(())
//! }
//! ```

use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    audit::{AuditEntry, AuditRecorder, PgAuditSink},
    db::AuditedDb,
    models::{Permission, Role, User},
};

/// Audited executor wired to a Postgres sink, as the container builds it
pub fn audited_db(pool: &PgPool) -> AuditedDb {
    let recorder = AuditRecorder::new(Arc::new(PgAuditSink::new(pool.clone())));
    AuditedDb::new(pool.clone()).with_interceptor(Arc::new(recorder))
}

/// Audit rows for `table`, oldest first
pub async fn audit_entries(pool: &PgPool, table: &str) -> Vec<AuditEntry> {
    sqlx::query_as::<_, AuditEntry>("SELECT * FROM audit_logs WHERE table_name = $1 ORDER BY id")
        .bind(table)
        .fetch_all(pool)
        .await
        .unwrap()
}

/// Builder for creating test users
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub email: String,
    pub status: i16,
    pub deleted: bool,
}

impl TestUser {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            status: 1,
            deleted: false,
        }
    }

    pub fn with_status(mut self, status: i16) -> Self {
        self.status = status;
        self
    }

    /// Insert as already soft-deleted
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, status, deleted_at)
            VALUES ($1, $2, 'not-a-hash', $3, CASE WHEN $4 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(self.username)
        .bind(self.email)
        .bind(self.status)
        .bind(self.deleted)
        .fetch_one(pool)
        .await
    }
}

/// Builder for creating test roles
#[derive(Debug, Clone)]
pub struct TestRole {
    pub name: String,
    pub deleted: bool,
}

impl TestRole {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            deleted: false,
        }
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, display_name, deleted_at)
            VALUES ($1, $1, CASE WHEN $2 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(self.name)
        .bind(self.deleted)
        .fetch_one(pool)
        .await
    }
}

/// Builder for creating test permissions
///
/// A name of the form `resource:action` fills in both columns.
#[derive(Debug, Clone)]
pub struct TestPermission {
    pub name: String,
    pub resource: String,
    pub action: String,
    pub deleted: bool,
}

impl TestPermission {
    pub fn new(name: &str) -> Self {
        let (resource, action) = name.split_once(':').unwrap_or((name, "read"));
        Self {
            name: name.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            deleted: false,
        }
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Permission> {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, resource, action, deleted_at)
            VALUES ($1, $2, $3, CASE WHEN $4 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(self.name)
        .bind(self.resource)
        .bind(self.action)
        .bind(self.deleted)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_name_split() {
        let permission = TestPermission::new("user:delete");
        assert_eq!(permission.resource, "user");
        assert_eq!(permission.action, "delete");

        let bare = TestPermission::new("reports");
        assert_eq!(bare.resource, "reports");
        assert_eq!(bare.action, "read");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_fixtures_are_not_audited(pool: PgPool) -> sqlx::Result<()> {
        let user = TestUser::new("fixture").deleted().insert(&pool).await?;
        assert!(user.deleted_at.is_some());
        TestRole::new("fixture").insert(&pool).await?;

        assert!(audit_entries(&pool, "users").await.is_empty());
        assert!(audit_entries(&pool, "roles").await.is_empty());
        Ok(())
    }
}
