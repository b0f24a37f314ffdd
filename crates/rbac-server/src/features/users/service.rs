//! User business rules

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::{
    password::{hash_password, PasswordError},
    types::{
        CreateUserRequest, UpdateUserRequest, UserDetailResponse, UserResponse, UserRolesResponse,
    },
};
use crate::{
    api::response::{ErrorResponse, PaginationMeta},
    context::AuditContext,
    db::{
        users::{NewUser, UserChanges},
        DbError, UserRepository,
    },
    features::shared::{
        validation::{
            validate_email, validate_ids, validate_optional, validate_password, validate_status,
            validate_username,
        },
        FieldValidationError, IdValidationError, PaginationParams,
    },
    models::STATUS_ENABLED,
};

const NICKNAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),

    #[error("User {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<FieldValidationError> for UserError {
    fn from(err: FieldValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdValidationError> for UserError {
    fn from(err: IdValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            UserError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            UserError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            UserError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            UserError::Database(DbError::Duplicate(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            UserError::Password(_) | UserError::Database(_) => {
                tracing::error!(error = %self, "User operation failed");
                let error = ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
            },
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

pub type UserResult<T> = Result<T, UserError>;

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: UserRepository, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    pub async fn create(
        &self,
        ctx: &AuditContext,
        request: CreateUserRequest,
    ) -> UserResult<UserResponse> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        validate_optional("nickname", request.nickname.as_deref(), NICKNAME_MAX_LENGTH)?;
        let status = request.status.unwrap_or(STATUS_ENABLED);
        validate_status(status)?;

        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(UserError::Conflict(format!(
                "Username '{}' is already taken",
                request.username
            )));
        }
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(UserError::Conflict(format!(
                "Email '{}' is already registered",
                request.email
            )));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create(
                ctx,
                &NewUser {
                    username: request.username,
                    email: request.email,
                    password_hash,
                    nickname: request.nickname,
                    status,
                },
            )
            .await?;

        Ok(user.into())
    }

    pub async fn get(&self, id: i64) -> UserResult<UserDetailResponse> {
        let user = self.users.find_by_id(id).await?.ok_or(UserError::NotFound(id))?;
        let roles = self.users.roles_of(id).await?;
        Ok(UserDetailResponse {
            user: user.into(),
            roles,
        })
    }

    pub async fn list(
        &self,
        params: &PaginationParams,
    ) -> UserResult<(Vec<UserResponse>, PaginationMeta)> {
        params.validate().map_err(|e| UserError::Validation(e.to_string()))?;

        let users = self.users.list(params.limit(), params.offset()).await?;
        let total = self.users.count().await?;

        Ok((users.into_iter().map(UserResponse::from).collect(), params.meta(total)))
    }

    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        request: UpdateUserRequest,
    ) -> UserResult<UserResponse> {
        if request.is_empty() {
            return Err(UserError::Validation("No fields to update".to_string()));
        }
        if let Some(ref email) = request.email {
            validate_email(email)?;
        }
        if let Some(ref password) = request.password {
            validate_password(password)?;
        }
        if let Some(status) = request.status {
            validate_status(status)?;
        }
        validate_optional("nickname", request.nickname.as_deref(), NICKNAME_MAX_LENGTH)?;

        if let Some(ref email) = request.email {
            if let Some(other) = self.users.find_by_email(email).await? {
                if other.id != id {
                    return Err(UserError::Conflict(format!(
                        "Email '{}' is already registered",
                        email
                    )));
                }
            }
        }

        let password_hash = match request.password {
            Some(ref password) => Some(hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };

        let changes = UserChanges {
            email: request.email,
            nickname: request.nickname,
            status: request.status,
            password_hash,
        };

        let user = self
            .users
            .update(ctx, id, &changes)
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    pub async fn delete(&self, ctx: &AuditContext, id: i64) -> UserResult<()> {
        if !self.users.delete(ctx, id).await? {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }

    pub async fn assign_roles(
        &self,
        ctx: &AuditContext,
        id: i64,
        role_ids: &[i64],
    ) -> UserResult<UserRolesResponse> {
        validate_ids("role_ids", role_ids)?;
        self.require(id).await?;

        let inserted = self.users.assign_roles(ctx, id, role_ids).await?;
        self.roles_response(id, inserted.len()).await
    }

    pub async fn remove_roles(
        &self,
        ctx: &AuditContext,
        id: i64,
        role_ids: &[i64],
    ) -> UserResult<UserRolesResponse> {
        validate_ids("role_ids", role_ids)?;
        self.require(id).await?;

        let removed = self.users.remove_roles(ctx, id, role_ids).await?;
        self.roles_response(id, removed.len()).await
    }

    pub async fn roles(&self, id: i64) -> UserResult<Vec<crate::models::Role>> {
        self.require(id).await?;
        Ok(self.users.roles_of(id).await?)
    }

    async fn require(&self, id: i64) -> UserResult<()> {
        match self.users.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(UserError::NotFound(id)),
        }
    }

    async fn roles_response(&self, id: i64, affected: usize) -> UserResult<UserRolesResponse> {
        Ok(UserRolesResponse {
            user_id: id,
            affected,
            roles: self.users.roles_of(id).await?,
        })
    }
}
