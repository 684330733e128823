//! `/api/attendance` routes.
//!
//! Teachers drive sessions and manage records; students submit scans; any
//! authenticated caller may pre-validate a scanned token.

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post, put},
};

use crate::auth::guards::{allow_authenticated, require_student, require_teacher};
use crate::state::AppState;

pub mod common;
pub mod get;
pub mod post;
pub mod put;

use get::{list_active_sessions, list_class_records};
use post::{
    create_session, mark_manual, rotate_token, submit_attendance, terminate_all_sessions,
    terminate_session, validate_token,
};
use put::update_attendance;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            post(create_session).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/sessions/active",
            get(list_active_sessions).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/sessions/rotate",
            post(rotate_token).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/sessions/terminate",
            post(terminate_session).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/sessions/terminate-all",
            post(terminate_all_sessions).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/validate",
            post(validate_token).route_layer(from_fn(allow_authenticated)),
        )
        .route(
            "/submit",
            post(submit_attendance).route_layer(from_fn(require_student)),
        )
        .route(
            "/manual",
            post(mark_manual).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/classes/{class_id}/records",
            get(list_class_records).route_layer(from_fn(require_teacher)),
        )
        .route(
            "/records/{record_id}",
            put(update_attendance).route_layer(from_fn(require_teacher)),
        )
}
