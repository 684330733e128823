use crate::auth::claims::{AuthUser, Role};
use crate::response::{ApiResponse, Empty};
use axum::{
    Json,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

type GuardRejection = (StatusCode, Json<ApiResponse<Empty>>);

/// Helper to extract and validate the user, then insert it back into the
/// request extensions for handlers to pick up.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardRejection> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

async fn allow_role(
    req: Request<Body>,
    next: Next,
    role: Role,
    failure_msg: &str,
) -> Result<Response, GuardRejection> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if user.role() != role {
        tracing::debug!(user = user.id(), role = ?user.role(), required = ?role, "Role check failed");
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error_with_kind("unauthorized", failure_msg)),
        ));
    }

    Ok(next.run(req).await)
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, _user) = extract_and_insert_authuser(req).await?;
    Ok(next.run(req).await)
}

pub async fn require_teacher(req: Request<Body>, next: Next) -> Result<Response, GuardRejection> {
    allow_role(req, next, Role::Teacher, "Teacher access required").await
}

pub async fn require_student(req: Request<Body>, next: Next) -> Result<Response, GuardRejection> {
    allow_role(req, next, Role::Student, "Student access required").await
}
