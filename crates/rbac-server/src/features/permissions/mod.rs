pub mod routes;
pub mod service;
pub mod types;

pub use routes::permissions_routes;
pub use service::{PermissionError, PermissionService};
pub use types::{CreatePermissionRequest, ListPermissionsQuery, UpdatePermissionRequest};
