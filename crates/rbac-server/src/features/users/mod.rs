pub mod password;
pub mod routes;
pub mod service;
pub mod types;

pub use routes::users_routes;
pub use service::{UserError, UserService};
pub use types::{CreateUserRequest, UpdateUserRequest, UserDetailResponse, UserResponse};
