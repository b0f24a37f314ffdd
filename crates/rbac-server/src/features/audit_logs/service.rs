use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use thiserror::Error;

use super::types::AuditLogQueryParams;
use crate::{
    api::response::{ErrorResponse, PaginationMeta},
    audit::{
        count_audit_logs, get_audit_trail, get_user_audit_logs, query_audit_logs, AuditEntry,
        MAX_AUDIT_QUERY_LIMIT,
    },
    db::DbError,
    features::shared::{validation::validate_name, FieldValidationError, IdValidationError},
};

const TABLE_NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<FieldValidationError> for AuditLogError {
    fn from(err: FieldValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdValidationError> for AuditLogError {
    fn from(err: IdValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AuditLogError {
    fn into_response(self) -> Response {
        match self {
            AuditLogError::Validation(message) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", message);
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            AuditLogError::Database(ref e) => {
                tracing::error!(error = %e, "Audit log query failed");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

pub type AuditLogResult<T> = Result<T, AuditLogError>;

#[derive(Clone)]
pub struct AuditLogService {
    pool: PgPool,
}

impl AuditLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered entries, newest first
    pub async fn query(
        &self,
        params: &AuditLogQueryParams,
    ) -> AuditLogResult<(Vec<AuditEntry>, PaginationMeta)> {
        let pagination = params.pagination();
        pagination
            .validate()
            .map_err(|e| AuditLogError::Validation(e.to_string()))?;

        let query = params.to_query();
        let entries = query_audit_logs(&self.pool, &query).await?;
        let total = count_audit_logs(&self.pool, &query).await?;

        Ok((entries, pagination.meta(total)))
    }

    /// History of one record, oldest first
    pub async fn trail(
        &self,
        table_name: &str,
        record_id: i64,
        limit: Option<i64>,
    ) -> AuditLogResult<Vec<AuditEntry>> {
        validate_name("table_name", table_name, TABLE_NAME_MAX_LENGTH)?;
        Self::check_limit(limit)?;
        Ok(get_audit_trail(&self.pool, table_name, record_id, limit).await?)
    }

    /// Recent entries attributed to one acting user, newest first
    pub async fn by_user(&self, user_id: i64, limit: Option<i64>) -> AuditLogResult<Vec<AuditEntry>> {
        Self::check_limit(limit)?;
        Ok(get_user_audit_logs(&self.pool, user_id, limit).await?)
    }

    fn check_limit(limit: Option<i64>) -> AuditLogResult<()> {
        match limit {
            Some(limit) if !(1..=MAX_AUDIT_QUERY_LIMIT).contains(&limit) => {
                Err(AuditLogError::Validation(format!(
                    "Limit must be between 1 and {}",
                    MAX_AUDIT_QUERY_LIMIT
                )))
            },
            _ => Ok(()),
        }
    }
}
