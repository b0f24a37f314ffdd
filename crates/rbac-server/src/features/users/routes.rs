//! User API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/users` - Create a user
//! - `GET /api/v1/users` - List users (`page`, `per_page`)
//! - `GET /api/v1/users/:id` - Get a user with their roles
//! - `PUT /api/v1/users/:id` - Partially update a user
//! - `DELETE /api/v1/users/:id` - Soft-delete a user
//! - `GET|POST|DELETE /api/v1/users/:id/roles` - List, assign or remove roles

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::{
    service::{UserResult, UserService},
    types::{CreateUserRequest, RoleIdsRequest, UpdateUserRequest},
};
use crate::{
    api::response::ApiResponse,
    context::AuditContext,
    features::shared::{parse_id, ApiJson, ApiQuery, PaginationParams},
};

pub fn users_routes() -> Router<UserService> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route(
            "/:id/roles",
            get(list_user_roles).post(assign_roles).delete(remove_roles),
        )
}

#[tracing::instrument(skip(service, ctx, request), fields(username = %request.username))]
async fn create_user(
    State(service): State<UserService>,
    ctx: AuditContext,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> UserResult<Response> {
    let user = service.create(&ctx, request).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_users(
    State(service): State<UserService>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> UserResult<Response> {
    let (users, pagination) = service.list(&params).await?;
    Ok(ApiResponse::paginated(users, pagination).into_response())
}

#[tracing::instrument(skip(service))]
async fn get_user(State(service): State<UserService>, Path(id): Path<String>) -> UserResult<Response> {
    let id = parse_id(&id)?;
    let user = service.get(id).await?;
    Ok(ApiResponse::success(user).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn update_user(
    State(service): State<UserService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> UserResult<Response> {
    let id = parse_id(&id)?;
    let user = service.update(&ctx, id, request).await?;

    tracing::info!(user_id = user.id, "User updated via API");

    Ok(ApiResponse::success(user).into_response())
}

#[tracing::instrument(skip(service, ctx))]
async fn delete_user(
    State(service): State<UserService>,
    ctx: AuditContext,
    Path(id): Path<String>,
) -> UserResult<Response> {
    let id = parse_id(&id)?;
    service.delete(&ctx, id).await?;

    tracing::info!(user_id = id, "User deleted via API");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_user_roles(
    State(service): State<UserService>,
    Path(id): Path<String>,
) -> UserResult<Response> {
    let id = parse_id(&id)?;
    let roles = service.roles(id).await?;
    Ok(ApiResponse::success(roles).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn assign_roles(
    State(service): State<UserService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RoleIdsRequest>,
) -> UserResult<Response> {
    let id = parse_id(&id)?;
    let result = service.assign_roles(&ctx, id, &request.role_ids).await?;

    tracing::info!(user_id = id, assigned = result.affected, "Roles assigned via API");

    Ok(ApiResponse::success(result).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn remove_roles(
    State(service): State<UserService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RoleIdsRequest>,
) -> UserResult<Response> {
    let id = parse_id(&id)?;
    let result = service.remove_roles(&ctx, id, &request.role_ids).await?;

    tracing::info!(user_id = id, removed = result.affected, "Roles removed via API");

    Ok(ApiResponse::success(result).into_response())
}
