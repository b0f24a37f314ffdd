//! Request context and access logging
//!
//! For every request this middleware:
//! - resolves the client address and the acting user
//! - stores an [`AuditContext`] in the request extensions for handlers
//! - tags the request with an `x-request-id` (kept if the client sent one)
//! - emits one access log event on the `access` target once the response is ready
//!
//! The acting user comes from the `x-user-id` header and is taken on trust.

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    response::Response,
};
use rbac_common::logging::ACCESS_TARGET;
use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::AuditContext;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const FORWARDED_FOR_HEADER: HeaderName = HeaderName::from_static("x-forwarded-for");
const REAL_IP_HEADER: HeaderName = HeaderName::from_static("x-real-ip");

/// Layer installing [`RequestContext`]
#[derive(Debug, Clone, Default)]
pub struct RequestContextLayer;

impl RequestContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContext<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContext { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext<S> {
    inner: S,
}

impl<S> Service<Request> for RequestContext<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // Drive the clone that was polled ready and leave a fresh one behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let headers = request.headers();

        let ip = client_ip(headers, request.extensions().get::<ConnectInfo<SocketAddr>>());
        let user_id = acting_user(headers);
        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let request_id = headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        request
            .extensions_mut()
            .insert(AuditContext::new(user_id, ip.clone()));

        Box::pin(async move {
            let mut response = inner.call(request).await?;

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            let status = response.status().as_u16();
            let latency_us = started.elapsed().as_micros() as u64;
            let ip = ip.unwrap_or_default();
            let user_id = user_id.unwrap_or(0);

            if is_write(&method) && !response.status().is_success() {
                warn!(
                    target: ACCESS_TARGET,
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status,
                    latency_us,
                    ip = %ip,
                    user_id,
                    user_agent = %user_agent,
                    "Write request failed"
                );
            } else {
                info!(
                    target: ACCESS_TARGET,
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status,
                    latency_us,
                    ip = %ip,
                    user_id,
                    user_agent = %user_agent,
                    "Request completed"
                );
            }

            Ok(response)
        })
    }
}

fn is_write(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer
///
/// Header values that do not parse as an IP address are skipped.
fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    let header_ip = |name: &HeaderName, first_hop: bool| -> Option<IpAddr> {
        let value = headers.get(name)?.to_str().ok()?;
        let candidate = if first_hop {
            value.split(',').next()?
        } else {
            value
        };
        candidate.trim().parse::<IpAddr>().ok()
    };

    header_ip(&FORWARDED_FOR_HEADER, true)
        .or_else(|| header_ip(&REAL_IP_HEADER, false))
        .or_else(|| connect_info.map(|ci| ci.0.ip()))
        .map(|ip| ip.to_string())
}

/// Positive integer from `x-user-id`; anything else means unknown
fn acting_user(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(&USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}
