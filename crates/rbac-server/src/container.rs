//! Application wiring
//!
//! [`AppContainer`] owns every long-lived component, built once at startup in
//! dependency order: pool, audit recorder, audited executor, repositories,
//! services. Each component is cheap to clone and shares its state.

use anyhow::Context;
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    api,
    audit::{AuditRecorder, PgAuditSink},
    config::Config,
    db::{self, AuditedDb, DbConfig, PermissionRepository, RoleRepository, UserRepository},
    features::{
        audit_logs::AuditLogService, permissions::PermissionService, roles::RoleService,
        users::UserService, FeatureState,
    },
};

/// Shared application components
#[derive(Clone)]
pub struct AppContainer {
    pub pool: PgPool,
    pub recorder: Arc<AuditRecorder>,
    pub db: AuditedDb,
    pub users: UserService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub audit_logs: AuditLogService,
}

impl AppContainer {
    /// Connect to the database and build the full component graph
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let pool = db::create_pool(&DbConfig::from(&config.database))
            .await
            .context("failed to create database pool")?;

        Ok(Self::from_pool(pool, config))
    }

    /// Build the component graph on top of an existing pool
    pub fn from_pool(pool: PgPool, config: &Config) -> Self {
        let recorder = Arc::new(AuditRecorder::new(Arc::new(PgAuditSink::new(pool.clone()))));
        let db = AuditedDb::new(pool.clone()).with_interceptor(recorder.clone());

        let users = UserService::new(UserRepository::new(db.clone()), config.security.bcrypt_cost);
        let roles = RoleService::new(RoleRepository::new(db.clone()));
        let permissions = PermissionService::new(PermissionRepository::new(db.clone()));
        let audit_logs = AuditLogService::new(pool.clone());

        tracing::debug!("Application container built");

        Self {
            pool,
            recorder,
            db,
            users,
            roles,
            permissions,
            audit_logs,
        }
    }

    pub fn feature_state(&self) -> FeatureState {
        FeatureState {
            users: self.users.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            audit_logs: self.audit_logs.clone(),
        }
    }

    /// Router serving every endpoint from this container
    pub fn router(&self, config: &Config) -> Router {
        api::create_router(self.feature_state(), self.pool.clone(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audit::AuditAction,
        context::AuditContext,
        features::{shared::test_helpers::audit_entries, users::CreateUserRequest},
    };

    fn test_config() -> Config {
        let mut config = Config::default();
        config.security.bcrypt_cost = 4;
        config
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_services_share_the_audited_executor(pool: PgPool) -> sqlx::Result<()> {
        let container = AppContainer::from_pool(pool.clone(), &test_config());
        let ctx = AuditContext::new(Some(3), Some("127.0.0.1".to_string()));

        let user = container
            .users
            .create(
                &ctx,
                CreateUserRequest {
                    username: "wired".to_string(),
                    email: "wired@example.com".to_string(),
                    password: "secret1".to_string(),
                    nickname: None,
                    status: None,
                },
            )
            .await
            .unwrap();

        let entries = audit_entries(&pool, "users").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record_id, user.id);
        assert_eq!(entries[0].action, AuditAction::Create.as_str());
        assert_eq!(entries[0].user_id, 3);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_clone_shares_pool(pool: PgPool) -> sqlx::Result<()> {
        let container = AppContainer::from_pool(pool, &test_config());
        let cloned = container.clone();

        assert!(db::health_check(&cloned.pool).await.is_ok());
        assert!(Arc::ptr_eq(&container.recorder, &cloned.recorder));

        Ok(())
    }
}
