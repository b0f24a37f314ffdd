//! Persistence layer
//!
//! Repositories own all SQL. Reads go straight to the pool; every write goes
//! through [`AuditedDb`] so registered [`WriteInterceptor`]s observe it.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub mod assignments;
pub mod entity;
pub mod executor;
pub mod interceptor;
pub mod permissions;
pub mod roles;
pub mod users;

pub use entity::{ById, Entity};
pub use executor::{AuditedDb, WriteOutput};
pub use interceptor::{
    LoadScope, Operation, PriorStateLoader, WriteInterceptor, WriteKind, WriteStatement,
};
pub use permissions::PermissionRepository;
pub use roles::RoleRepository;
pub use users::UserRepository;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Record already exists (unique constraint violation)
    #[error("{0}")]
    Duplicate(String),
}

impl DbError {
    /// Create a not found error with resource context
    pub fn not_found(resource_type: &str, identifier: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}' not found", resource_type, identifier))
    }

    /// Create a duplicate error with resource context
    pub fn duplicate(resource_type: &str, identifier: impl std::fmt::Display) -> Self {
        Self::Duplicate(format!("{} '{}' already exists", resource_type, identifier))
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the underlying driver error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            Self::Duplicate(_) => true,
            _ => false,
        }
    }

    /// Replace a unique constraint violation with a domain error
    pub fn on_unique(self, duplicate: impl FnOnce() -> Self) -> Self {
        if self.is_unique_violation() {
            duplicate()
        } else {
            self
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl From<&DatabaseConfig> for DbConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: Some(config.idle_timeout_secs),
        }
    }
}

impl DbConfig {
    pub fn validate(&self) -> DbResult<()> {
        if self.url.is_empty() {
            return Err(DbError::config("DATABASE_URL is empty"));
        }
        // Audit reads and inserts need a connection besides the one doing the write
        if self.max_connections < 2 {
            return Err(DbError::config(format!(
                "max_connections must be at least 2, got {}",
                self.max_connections
            )));
        }
        Ok(())
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    config.validate()?;

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if let Some(idle_timeout) = config.idle_timeout_secs {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = options.connect(&config.url).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_config(max_connections: u32) -> DbConfig {
        DbConfig {
            url: "postgresql://localhost/rbac".to_string(),
            max_connections,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: None,
        }
    }

    #[test]
    fn test_from_database_config() {
        let config = DbConfig::from(&crate::config::Config::default().database);
        assert_eq!(config.max_connections, crate::config::DEFAULT_DATABASE_MAX_CONNECTIONS);
        assert_eq!(
            config.idle_timeout_secs,
            Some(crate::config::DEFAULT_DATABASE_IDLE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_validate_requires_spare_connection() {
        assert!(db_config(2).validate().is_ok());
        assert!(matches!(db_config(1).validate(), Err(DbError::Config(_))));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(DbError::not_found("User", 7).to_string(), "User '7' not found");
        assert_eq!(
            DbError::duplicate("Role", "admin").to_string(),
            "Role 'admin' already exists"
        );
        assert!(DbError::duplicate("Role", "admin").is_unique_violation());
        assert!(!DbError::not_found("Role", 1).is_unique_violation());
    }

    #[test]
    fn test_on_unique_keeps_other_errors() {
        let err = DbError::Sqlx(sqlx::Error::RowNotFound).on_unique(|| DbError::duplicate("User", "x"));
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::RowNotFound)));

        let err = DbError::duplicate("User", "a").on_unique(|| DbError::duplicate("User", "b"));
        assert_eq!(err.to_string(), "User 'b' already exists");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_health_check(pool: PgPool) -> sqlx::Result<()> {
        assert!(health_check(&pool).await.is_ok());
        Ok(())
    }
}
