//! Permission business rules

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::types::{CreatePermissionRequest, ListPermissionsQuery, UpdatePermissionRequest};
use crate::{
    api::response::{ErrorResponse, PaginationMeta},
    context::AuditContext,
    db::{
        permissions::{NewPermission, PermissionChanges},
        DbError, PermissionRepository,
    },
    features::shared::{
        validation::{validate_name, validate_optional, validate_status},
        FieldValidationError, IdValidationError,
    },
    models::{Permission, STATUS_ENABLED},
};

const NAME_MAX_LENGTH: usize = 100;
const DESCRIPTION_MAX_LENGTH: usize = 255;
const RESOURCE_MAX_LENGTH: usize = 50;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("{0}")]
    Validation(String),

    #[error("Permission {0} not found")]
    NotFound(i64),

    #[error("Permission '{0}' already exists")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<FieldValidationError> for PermissionError {
    fn from(err: FieldValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdValidationError> for PermissionError {
    fn from(err: IdValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            PermissionError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            PermissionError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PermissionError::Conflict(_) | PermissionError::Database(DbError::Duplicate(_)) => {
                (StatusCode::CONFLICT, "CONFLICT")
            },
            PermissionError::Database(_) => {
                tracing::error!(error = %self, "Permission operation failed");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
            },
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

pub type PermissionResult<T> = Result<T, PermissionError>;

#[derive(Clone)]
pub struct PermissionService {
    permissions: PermissionRepository,
}

impl PermissionService {
    pub fn new(permissions: PermissionRepository) -> Self {
        Self { permissions }
    }

    pub async fn create(
        &self,
        ctx: &AuditContext,
        request: CreatePermissionRequest,
    ) -> PermissionResult<Permission> {
        validate_name("name", &request.name, NAME_MAX_LENGTH)?;
        validate_name("display_name", &request.display_name, NAME_MAX_LENGTH)?;
        validate_name("resource", &request.resource, RESOURCE_MAX_LENGTH)?;
        validate_name("action", &request.action, RESOURCE_MAX_LENGTH)?;
        validate_optional("description", Some(&request.description), DESCRIPTION_MAX_LENGTH)?;
        let status = request.status.unwrap_or(STATUS_ENABLED);
        validate_status(status)?;

        if self.permissions.find_by_name(&request.name).await?.is_some() {
            return Err(PermissionError::Conflict(request.name));
        }

        let permission = self
            .permissions
            .create(
                ctx,
                &NewPermission {
                    name: request.name,
                    display_name: request.display_name,
                    description: request.description,
                    resource: request.resource,
                    action: request.action,
                    status,
                },
            )
            .await?;

        Ok(permission)
    }

    pub async fn get(&self, id: i64) -> PermissionResult<Permission> {
        self.permissions
            .find_by_id(id)
            .await?
            .ok_or(PermissionError::NotFound(id))
    }

    pub async fn list(
        &self,
        query: &ListPermissionsQuery,
    ) -> PermissionResult<(Vec<Permission>, PaginationMeta)> {
        let params = query.pagination();
        params.validate().map_err(|e| PermissionError::Validation(e.to_string()))?;
        let filter = query.filter();

        let permissions = self.permissions.list(&filter, params.limit(), params.offset()).await?;
        let total = self.permissions.count(&filter).await?;

        Ok((permissions, params.meta(total)))
    }

    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        request: UpdatePermissionRequest,
    ) -> PermissionResult<Permission> {
        if request.is_empty() {
            return Err(PermissionError::Validation("No fields to update".to_string()));
        }
        if let Some(ref display_name) = request.display_name {
            validate_name("display_name", display_name, NAME_MAX_LENGTH)?;
        }
        if let Some(ref resource) = request.resource {
            validate_name("resource", resource, RESOURCE_MAX_LENGTH)?;
        }
        if let Some(ref action) = request.action {
            validate_name("action", action, RESOURCE_MAX_LENGTH)?;
        }
        validate_optional("description", request.description.as_deref(), DESCRIPTION_MAX_LENGTH)?;
        if let Some(status) = request.status {
            validate_status(status)?;
        }

        let changes = PermissionChanges {
            display_name: request.display_name,
            description: request.description,
            resource: request.resource,
            action: request.action,
            status: request.status,
        };

        self.permissions
            .update(ctx, id, &changes)
            .await?
            .ok_or(PermissionError::NotFound(id))
    }

    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> PermissionResult<()> {
        if !self.permissions.delete(ctx, id).await? {
            return Err(PermissionError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{audit_entries, audited_db};
    use sqlx::PgPool;

    fn service(pool: &PgPool) -> PermissionService {
        PermissionService::new(PermissionRepository::new(audited_db(pool)))
    }

    fn create_request(resource: &str, action: &str) -> CreatePermissionRequest {
        CreatePermissionRequest {
            name: format!("{}:{}", resource, action),
            display_name: format!("{} {}", action, resource),
            description: String::new(),
            resource: resource.to_string(),
            action: action.to_string(),
            status: None,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_create_and_filter(pool: PgPool) -> sqlx::Result<()> {
        let service = service(&pool);
        let ctx = AuditContext::system();
        service.create(&ctx, create_request("user", "create")).await.unwrap();
        service.create(&ctx, create_request("user", "delete")).await.unwrap();
        service.create(&ctx, create_request("role", "create")).await.unwrap();

        let query = ListPermissionsQuery {
            action: Some("create".to_string()),
            ..Default::default()
        };
        let (permissions, meta) = service.list(&query).await.unwrap();
        assert_eq!(permissions.len(), 2);
        assert_eq!(meta.total, 2);

        let err = service
            .create(&ctx, create_request("user", "create"))
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Conflict(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_update_and_delete_are_audited(pool: PgPool) -> sqlx::Result<()> {
        let service = service(&pool);
        let ctx = AuditContext::new(Some(9), None);
        let permission = service.create(&ctx, create_request("report", "read")).await.unwrap();

        let updated = service
            .update(
                &ctx,
                permission.id,
                UpdatePermissionRequest {
                    display_name: Some("Read reports".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Read reports");

        service.delete(&ctx, permission.id).await.unwrap();
        assert!(matches!(service.get(permission.id).await, Err(PermissionError::NotFound(_))));

        let actions: Vec<_> = audit_entries(&pool, "permissions")
            .await
            .into_iter()
            .map(|e| (e.action, e.user_id))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("create".to_string(), 9),
                ("update".to_string(), 9),
                ("delete".to_string(), 9)
            ]
        );

        Ok(())
    }
}
