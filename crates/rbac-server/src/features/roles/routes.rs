//! Role API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/roles` - Create a role
//! - `GET /api/v1/roles` - List roles (`page`, `per_page`)
//! - `GET /api/v1/roles/:id` - Get a role with its permissions
//! - `PUT /api/v1/roles/:id` - Partially update a role
//! - `DELETE /api/v1/roles/:id` - Soft-delete a role and drop its assignments
//! - `GET|POST|DELETE /api/v1/roles/:id/permissions` - List, grant or revoke permissions
//! - `GET|POST|DELETE /api/v1/roles/:id/users` - List, add or remove members

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::{
    service::{RoleResult, RoleService},
    types::{CreateRoleRequest, PermissionIdsRequest, UpdateRoleRequest, UserIdsRequest},
};
use crate::{
    api::response::ApiResponse,
    context::AuditContext,
    features::shared::{parse_id, ApiJson, ApiQuery, PaginationParams},
};

pub fn roles_routes() -> Router<RoleService> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route(
            "/:id/permissions",
            get(list_role_permissions)
                .post(assign_permissions)
                .delete(remove_permissions),
        )
        .route(
            "/:id/users",
            get(list_role_users).post(assign_users).delete(remove_users),
        )
}

#[tracing::instrument(skip(service, ctx, request), fields(name = %request.name))]
async fn create_role(
    State(service): State<RoleService>,
    ctx: AuditContext,
    ApiJson(request): ApiJson<CreateRoleRequest>,
) -> RoleResult<Response> {
    let role = service.create(&ctx, request).await?;

    tracing::info!(role_id = role.id, role_name = %role.name, "Role created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_roles(
    State(service): State<RoleService>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> RoleResult<Response> {
    let (roles, pagination) = service.list(&params).await?;
    Ok(ApiResponse::paginated(roles, pagination).into_response())
}

#[tracing::instrument(skip(service))]
async fn get_role(State(service): State<RoleService>, Path(id): Path<String>) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(service.get(id).await?).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn update_role(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    let role = service.update(&ctx, id, request).await?;

    tracing::info!(role_id = role.id, "Role updated via API");

    Ok(ApiResponse::success(role).into_response())
}

#[tracing::instrument(skip(service, ctx))]
async fn delete_role(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    service.delete(&ctx, id).await?;

    tracing::info!(role_id = id, "Role deleted via API");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_role_permissions(
    State(service): State<RoleService>,
    Path(id): Path<String>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(service.permissions(id).await?).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn assign_permissions(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<PermissionIdsRequest>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    let result = service.assign_permissions(&ctx, id, &request.permission_ids).await?;

    tracing::info!(role_id = id, assigned = result.affected, "Permissions assigned via API");

    Ok(ApiResponse::success(result).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn remove_permissions(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<PermissionIdsRequest>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    let result = service.remove_permissions(&ctx, id, &request.permission_ids).await?;

    tracing::info!(role_id = id, removed = result.affected, "Permissions removed via API");

    Ok(ApiResponse::success(result).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_role_users(
    State(service): State<RoleService>,
    Path(id): Path<String>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(service.users(id).await?).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn assign_users(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UserIdsRequest>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    let result = service.assign_users(&ctx, id, &request.user_ids).await?;

    tracing::info!(role_id = id, assigned = result.affected, "Users assigned via API");

    Ok(ApiResponse::success(result).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn remove_users(
    State(service): State<RoleService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UserIdsRequest>,
) -> RoleResult<Response> {
    let id = parse_id(&id)?;
    let result = service.remove_users(&ctx, id, &request.user_ids).await?;

    tracing::info!(role_id = id, removed = result.affected, "Users removed via API");

    Ok(ApiResponse::success(result).into_response())
}
