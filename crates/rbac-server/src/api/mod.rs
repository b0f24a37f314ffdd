//! HTTP surface: router assembly and the server loop

pub mod response;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::{
    future::{Future, IntoFuture},
    net::SocketAddr,
    time::Duration,
};
use tower_http::compression::CompressionLayer;

use crate::{
    config::Config,
    container::AppContainer,
    db,
    error::AppError,
    features::{self, FeatureState},
    middleware,
};
use response::ApiResponse;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, pool: PgPool, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(pool)
        .nest("/api/v1", features::router(state))
        .fallback(not_found)
        // Applied innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::RequestContextLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind and serve until `shutdown` resolves
///
/// In-flight requests then get up to `shutdown_timeout_secs` to finish before
/// the server stops waiting for them.
pub async fn serve(
    config: &Config,
    container: AppContainer,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = container.router(config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        let _ = signalled_tx.send(());
    })
    .into_future();

    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(drain_timeout).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => {
            tracing::warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Shutdown timeout elapsed with requests still in flight"
            );
        },
    }

    Ok(())
}

async fn health(State(pool): State<PgPool>) -> Result<Response, AppError> {
    db::health_check(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::Internal("database unreachable".to_string())
    })?;

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "database": "connected"
    }))
    .into_response())
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
