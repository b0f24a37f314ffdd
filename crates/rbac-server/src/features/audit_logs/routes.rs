//! Audit log API routes
//!
//! # Route Structure
//!
//! - `GET /api/v1/audit-logs` - Query entries (`table_name`, `record_id`, `action`,
//!   `user_id`, `page`, `per_page`), newest first
//! - `GET /api/v1/audit-logs/actors/:user_id` - Recent entries by one acting user
//! - `GET /api/v1/audit-logs/:table/:record_id` - History of one record, oldest first

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::{
    service::{AuditLogResult, AuditLogService},
    types::{AuditLogQueryParams, LimitParams},
};
use crate::{
    api::response::ApiResponse,
    features::shared::{parse_id, ApiQuery},
};

pub fn audit_logs_routes() -> Router<AuditLogService> {
    Router::new()
        .route("/", get(query_audit_logs))
        .route("/actors/:user_id", get(user_audit_logs))
        .route("/:table/:record_id", get(audit_trail))
}

#[tracing::instrument(skip(service))]
async fn query_audit_logs(
    State(service): State<AuditLogService>,
    ApiQuery(params): ApiQuery<AuditLogQueryParams>,
) -> AuditLogResult<Response> {
    let (entries, pagination) = service.query(&params).await?;
    Ok(ApiResponse::paginated(entries, pagination).into_response())
}

#[tracing::instrument(skip(service))]
async fn audit_trail(
    State(service): State<AuditLogService>,
    Path((table, record_id)): Path<(String, String)>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> AuditLogResult<Response> {
    let record_id = parse_id(&record_id)?;
    let entries = service.trail(&table, record_id, params.limit).await?;
    Ok(ApiResponse::success(entries).into_response())
}

#[tracing::instrument(skip(service))]
async fn user_audit_logs(
    State(service): State<AuditLogService>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> AuditLogResult<Response> {
    let user_id = parse_id(&user_id)?;
    let entries = service.by_user(user_id, params.limit).await?;
    Ok(ApiResponse::success(entries).into_response())
}
