//! Request-scoped attribution for audited writes
//!
//! The HTTP layer resolves who is acting and from where, stores an
//! [`AuditContext`] in the request extensions, and handlers pass it explicitly
//! through services and repositories down to [`crate::db::AuditedDb`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Acting user and client address for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: Option<i64>,
    pub ip: Option<String>,
}

impl AuditContext {
    pub fn new(user_id: Option<i64>, ip: Option<String>) -> Self {
        Self { user_id, ip }
    }

    /// Context for writes with no request behind them (startup, tests)
    pub fn system() -> Self {
        Self::default()
    }

    /// Acting user id as recorded in the audit log, `0` when unknown
    pub fn recorded_user_id(&self) -> i64 {
        self.user_id.unwrap_or(0)
    }

    /// Client address as recorded in the audit log, empty when unknown
    pub fn recorded_ip(&self) -> String {
        self.ip.clone().unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuditContext>()
            .cloned()
            .unwrap_or_default())
    }
}
