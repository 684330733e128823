use crate::auth::claims::AuthUser;
use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::TypedHeader;
use headers::UserAgent;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// Logs method, path, client IP, user id and role (if authenticated),
/// user-agent, response status and latency for each request. CORS preflight
/// requests are passed through silently.
///
/// ```ignore
/// let app = Router::new().layer(from_fn(log_request));
/// ```
///
/// Requires the server to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    if parts.method == Method::OPTIONS {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let user = AuthUser::from_request_parts(&mut parts, &()).await.ok();
    let user_agent = TypedHeader::<UserAgent>::from_request_parts(&mut parts, &())
        .await
        .ok()
        .map(|TypedHeader(ua)| ua.to_string());

    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();
    let started = Instant::now();

    let response = next.run(Request::from_parts(parts, body)).await;

    info!(
        method = %method,
        path = %path,
        ip = %addr.ip(),
        user = user.as_ref().map(AuthUser::id).unwrap_or(0),
        role = ?user.as_ref().map(AuthUser::role),
        user_agent = user_agent.as_deref().unwrap_or("unknown"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );

    response
}
