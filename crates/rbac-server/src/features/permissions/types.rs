//! Request bodies and filters for the permissions API

use serde::{Deserialize, Serialize};

use crate::db::permissions::PermissionFilter;
use crate::features::shared::PaginationParams;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermissionRequest {
    /// Conventionally `resource:action`, e.g. `user:create`
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub status: Option<i16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermissionRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status: Option<i16>,
}

impl UpdatePermissionRequest {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.resource.is_none()
            && self.action.is_none()
            && self.status.is_none()
    }
}

/// Query string of `GET /permissions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPermissionsQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl ListPermissionsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    /// Empty filter values match everything
    pub fn filter(&self) -> PermissionFilter {
        PermissionFilter {
            resource: self.resource.clone().filter(|s| !s.is_empty()),
            action: self.action.clone().filter(|s| !s.is_empty()),
        }
    }
}
