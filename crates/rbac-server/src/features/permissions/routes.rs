//! Permission API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/permissions` - Create a permission
//! - `GET /api/v1/permissions` - List permissions (`page`, `per_page`, `resource`, `action`)
//! - `GET /api/v1/permissions/:id` - Get a permission
//! - `PUT /api/v1/permissions/:id` - Partially update a permission
//! - `DELETE /api/v1/permissions/:id` - Soft-delete a permission

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::{
    service::{PermissionResult, PermissionService},
    types::{CreatePermissionRequest, ListPermissionsQuery, UpdatePermissionRequest},
};
use crate::{
    api::response::ApiResponse,
    context::AuditContext,
    features::shared::{parse_id, ApiJson, ApiQuery},
};

pub fn permissions_routes() -> Router<PermissionService> {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route(
            "/:id",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
}

#[tracing::instrument(skip(service, ctx, request), fields(name = %request.name))]
async fn create_permission(
    State(service): State<PermissionService>,
    ctx: AuditContext,
    ApiJson(request): ApiJson<CreatePermissionRequest>,
) -> PermissionResult<Response> {
    let permission = service.create(&ctx, request).await?;

    tracing::info!(
        permission_id = permission.id,
        permission_name = %permission.name,
        "Permission created via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(permission))).into_response())
}

#[tracing::instrument(skip(service))]
async fn list_permissions(
    State(service): State<PermissionService>,
    ApiQuery(query): ApiQuery<ListPermissionsQuery>,
) -> PermissionResult<Response> {
    let (permissions, pagination) = service.list(&query).await?;
    Ok(ApiResponse::paginated(permissions, pagination).into_response())
}

#[tracing::instrument(skip(service))]
async fn get_permission(
    State(service): State<PermissionService>,
    Path(id): Path<String>,
) -> PermissionResult<Response> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(service.get(id).await?).into_response())
}

#[tracing::instrument(skip(service, ctx, request))]
async fn update_permission(
    State(service): State<PermissionService>,
    ctx: AuditContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdatePermissionRequest>,
) -> PermissionResult<Response> {
    let id = parse_id(&id)?;
    let permission = service.update(&ctx, id, request).await?;

    tracing::info!(permission_id = permission.id, "Permission updated via API");

    Ok(ApiResponse::success(permission).into_response())
}

#[tracing::instrument(skip(service, ctx))]
async fn delete_permission(
    State(service): State<PermissionService>,
    ctx: AuditContext,
    Path(id): Path<String>,
) -> PermissionResult<Response> {
    let id = parse_id(&id)?;
    service.delete(&ctx, id).await?;

    tracing::info!(permission_id = id, "Permission deleted via API");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })).into_response())
}
