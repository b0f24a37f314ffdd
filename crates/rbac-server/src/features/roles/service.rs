//! Role business rules

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::types::{
    CreateRoleRequest, RoleDetailResponse, RolePermissionsResponse, RoleUsersResponse,
    UpdateRoleRequest,
};
use crate::{
    api::response::{ErrorResponse, PaginationMeta},
    context::AuditContext,
    db::{
        roles::{NewRole, RoleChanges},
        DbError, RoleRepository,
    },
    features::{
        shared::{
            validation::{validate_ids, validate_name, validate_optional, validate_status},
            FieldValidationError, IdValidationError, PaginationParams,
        },
        users::UserResponse,
    },
    models::{Permission, Role, STATUS_ENABLED},
};

const NAME_MAX_LENGTH: usize = 100;
const DESCRIPTION_MAX_LENGTH: usize = 255;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("{0}")]
    Validation(String),

    #[error("Role {0} not found")]
    NotFound(i64),

    #[error("Role '{0}' already exists")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<FieldValidationError> for RoleError {
    fn from(err: FieldValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdValidationError> for RoleError {
    fn from(err: IdValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for RoleError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RoleError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            RoleError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RoleError::Conflict(_) | RoleError::Database(DbError::Duplicate(_)) => {
                (StatusCode::CONFLICT, "CONFLICT")
            },
            RoleError::Database(_) => {
                tracing::error!(error = %self, "Role operation failed");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
            },
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

pub type RoleResult<T> = Result<T, RoleError>;

#[derive(Clone)]
pub struct RoleService {
    roles: RoleRepository,
}

impl RoleService {
    pub fn new(roles: RoleRepository) -> Self {
        Self { roles }
    }

    pub async fn create(&self, ctx: &AuditContext, request: CreateRoleRequest) -> RoleResult<Role> {
        validate_name("name", &request.name, NAME_MAX_LENGTH)?;
        validate_name("display_name", &request.display_name, NAME_MAX_LENGTH)?;
        validate_optional("description", Some(&request.description), DESCRIPTION_MAX_LENGTH)?;
        let status = request.status.unwrap_or(STATUS_ENABLED);
        validate_status(status)?;

        if self.roles.find_by_name(&request.name).await?.is_some() {
            return Err(RoleError::Conflict(request.name));
        }

        let role = self
            .roles
            .create(
                ctx,
                &NewRole {
                    name: request.name,
                    display_name: request.display_name,
                    description: request.description,
                    status,
                },
            )
            .await?;

        Ok(role)
    }

    pub async fn get(&self, id: i64) -> RoleResult<RoleDetailResponse> {
        let role = self.roles.find_by_id(id).await?.ok_or(RoleError::NotFound(id))?;
        let permissions = self.roles.permissions_of(id).await?;
        Ok(RoleDetailResponse { role, permissions })
    }

    pub async fn list(&self, params: &PaginationParams) -> RoleResult<(Vec<Role>, PaginationMeta)> {
        params.validate().map_err(|e| RoleError::Validation(e.to_string()))?;

        let roles = self.roles.list(params.limit(), params.offset()).await?;
        let total = self.roles.count().await?;

        Ok((roles, params.meta(total)))
    }

    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        request: UpdateRoleRequest,
    ) -> RoleResult<Role> {
        if request.is_empty() {
            return Err(RoleError::Validation("No fields to update".to_string()));
        }
        if let Some(ref display_name) = request.display_name {
            validate_name("display_name", display_name, NAME_MAX_LENGTH)?;
        }
        validate_optional("description", request.description.as_deref(), DESCRIPTION_MAX_LENGTH)?;
        if let Some(status) = request.status {
            validate_status(status)?;
        }

        let changes = RoleChanges {
            display_name: request.display_name,
            description: request.description,
            status: request.status,
        };

        self.roles
            .update(ctx, id, &changes)
            .await?
            .ok_or(RoleError::NotFound(id))
    }

    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> RoleResult<()> {
        if !self.roles.delete(ctx, id).await? {
            return Err(RoleError::NotFound(id));
        }
        Ok(())
    }

    pub async fn assign_permissions(
        &self,
        ctx: &AuditContext,
        id: i64,
        permission_ids: &[i64],
    ) -> RoleResult<RolePermissionsResponse> {
        validate_ids("permission_ids", permission_ids)?;
        self.require(id).await?;

        let inserted = self.roles.assign_permissions(ctx, id, permission_ids).await?;
        Ok(RolePermissionsResponse {
            role_id: id,
            affected: inserted.len(),
            permissions: self.roles.permissions_of(id).await?,
        })
    }

    pub async fn remove_permissions(
        &self,
        ctx: &AuditContext,
        id: i64,
        permission_ids: &[i64],
    ) -> RoleResult<RolePermissionsResponse> {
        validate_ids("permission_ids", permission_ids)?;
        self.require(id).await?;

        let removed = self.roles.remove_permissions(ctx, id, permission_ids).await?;
        Ok(RolePermissionsResponse {
            role_id: id,
            affected: removed.len(),
            permissions: self.roles.permissions_of(id).await?,
        })
    }

    pub async fn permissions(&self, id: i64) -> RoleResult<Vec<Permission>> {
        self.require(id).await?;
        Ok(self.roles.permissions_of(id).await?)
    }

    pub async fn assign_users(
        &self,
        ctx: &AuditContext,
        id: i64,
        user_ids: &[i64],
    ) -> RoleResult<RoleUsersResponse> {
        validate_ids("user_ids", user_ids)?;
        self.require(id).await?;

        let inserted = self.roles.assign_users(ctx, id, user_ids).await?;
        Ok(RoleUsersResponse {
            role_id: id,
            affected: inserted.len(),
            users: self.users_of(id).await?,
        })
    }

    pub async fn remove_users(
        &self,
        ctx: &AuditContext,
        id: i64,
        user_ids: &[i64],
    ) -> RoleResult<RoleUsersResponse> {
        validate_ids("user_ids", user_ids)?;
        self.require(id).await?;

        let removed = self.roles.remove_users(ctx, id, user_ids).await?;
        Ok(RoleUsersResponse {
            role_id: id,
            affected: removed.len(),
            users: self.users_of(id).await?,
        })
    }

    pub async fn users(&self, id: i64) -> RoleResult<Vec<UserResponse>> {
        self.require(id).await?;
        self.users_of(id).await
    }

    async fn users_of(&self, id: i64) -> RoleResult<Vec<UserResponse>> {
        let users = self.roles.users_of(id).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    async fn require(&self, id: i64) -> RoleResult<()> {
        match self.roles.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(RoleError::NotFound(id)),
        }
    }
}
