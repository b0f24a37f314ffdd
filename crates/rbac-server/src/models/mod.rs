//! Database models
//!
//! Every persisted type implements [`Entity`] so the audited write path can
//! resolve its table, primary key and soft-delete behaviour without
//! per-type code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::Entity;

/// Status value for an enabled user, role or permission
pub const STATUS_ENABLED: i16 = 1;

/// Status value for a disabled user, role or permission
pub const STATUS_DISABLED: i16 = 0;

/// User account
///
/// `password_hash` never leaves the server: API responses go through
/// `UserResponse` and audit snapshots drop it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub nickname: Option<String>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const SOFT_DELETE: bool = true;

    fn primary_key(&self) -> i64 {
        self.id
    }
}

/// Role model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Role {
    const TABLE: &'static str = "roles";
    const SOFT_DELETE: bool = true;

    fn primary_key(&self) -> i64 {
        self.id
    }
}

/// Permission model, e.g. `user:create` on resource `user` with action `create`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Permission {
    const TABLE: &'static str = "permissions";
    const SOFT_DELETE: bool = true;

    fn primary_key(&self) -> i64 {
        self.id
    }
}

/// User to role assignment row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for UserRole {
    const TABLE: &'static str = "user_roles";

    fn primary_key(&self) -> i64 {
        self.id
    }
}

/// Role to permission assignment row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub id: i64,
    pub role_id: i64,
    pub permission_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for RolePermission {
    const TABLE: &'static str = "role_permissions";

    fn primary_key(&self) -> i64 {
        self.id
    }
}
