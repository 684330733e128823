//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness and database reachability (public)
//! - `/attendance` → QR session protocol and attendance records (role-guarded per route)

use crate::routes::{attendance::attendance_routes, health::health_routes};
use crate::state::AppState;
use axum::Router;

pub mod attendance;
pub mod common;
pub mod health;

/// Builds the complete `/api` router with its state applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/attendance", attendance_routes())
        .with_state(app_state)
}
