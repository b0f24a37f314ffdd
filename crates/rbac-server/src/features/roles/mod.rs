pub mod routes;
pub mod service;
pub mod types;

pub use routes::roles_routes;
pub use service::{RoleError, RoleService};
pub use types::{CreateRoleRequest, RoleDetailResponse, UpdateRoleRequest};
