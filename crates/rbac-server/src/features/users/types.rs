//! Request and response bodies for the users API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Role, User};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Defaults to enabled
    #[serde(default)]
    pub status: Option<i16>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub status: Option<i16>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nickname.is_none()
            && self.status.is_none()
            && self.password.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleIdsRequest {
    pub role_ids: Vec<i64>,
}

/// User as exposed over the API; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            nickname: user.nickname,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A user with the roles assigned to them
#[derive(Debug, Clone, Serialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub roles: Vec<Role>,
}

/// Result of an assignment change
#[derive(Debug, Clone, Serialize)]
pub struct UserRolesResponse {
    pub user_id: i64,
    /// Rows actually inserted or removed
    pub affected: usize,
    /// Roles assigned after the change
    pub roles: Vec<Role>,
}
