//! Feature modules implementing the RBAC API
//!
//! Each feature is a vertical slice with its own request types, service
//! (business rules and error mapping) and routes.
//!
//! # Features
//!
//! - **users**: User accounts and their role assignments
//! - **roles**: Roles, their permissions and their members
//! - **permissions**: Permission catalogue with resource/action filters
//! - **audit_logs**: Read access to the change audit
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `types.rs` - Request and response bodies
//! - `service.rs` - Business rules and the feature error type
//! - `routes.rs` - HTTP route definitions
//!
//! Writes carry the request's [`crate::context::AuditContext`] down to the
//! repositories so the audit recorder can attribute them.

pub mod audit_logs;
pub mod permissions;
pub mod roles;
pub mod shared;
pub mod users;

use axum::Router;

use audit_logs::AuditLogService;
use permissions::PermissionService;
use roles::RoleService;
use users::UserService;

/// Services handed to the feature routers
#[derive(Clone)]
pub struct FeatureState {
    pub users: UserService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub audit_logs: AuditLogService,
}

/// Creates the API router with all feature routes mounted
///
/// - `/users` - User management
/// - `/roles` - Role management and assignments
/// - `/permissions` - Permission management
/// - `/audit-logs` - Audit queries
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/users", users::users_routes().with_state(state.users))
        .nest("/roles", roles::roles_routes().with_state(state.roles))
        .nest(
            "/permissions",
            permissions::permissions_routes().with_state(state.permissions),
        )
        .nest(
            "/audit-logs",
            audit_logs::audit_logs_routes().with_state(state.audit_logs),
        )
}
