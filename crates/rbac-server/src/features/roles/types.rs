//! Request and response bodies for the roles API

use serde::{Deserialize, Serialize};

use crate::{
    features::users::UserResponse,
    models::{Permission, Role},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<i16>,
}

/// Partial update; the role name cannot change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<i16>,
}

impl UpdateRoleRequest {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionIdsRequest {
    pub permission_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserIdsRequest {
    pub user_ids: Vec<i64>,
}

/// A role with the permissions granted to it
#[derive(Debug, Clone, Serialize)]
pub struct RoleDetailResponse {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolePermissionsResponse {
    pub role_id: i64,
    pub affected: usize,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleUsersResponse {
    pub role_id: i64,
    pub affected: usize,
    pub users: Vec<UserResponse>,
}
