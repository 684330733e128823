use crate::{response::ApiResponse, state::AppState};
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use util::config::AppConfig;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize, Default)]
struct HealthStatus {
    env: String,
    database: bool,
}

/// GET /health
///
/// `200 OK` when the database answers a ping, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let env = AppConfig::global().env.clone();

    match state.db().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                HealthStatus {
                    env,
                    database: true,
                },
                "Health check passed",
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: HealthStatus {
                        env,
                        database: false,
                    },
                    message: "Database unreachable".into(),
                    error_kind: None,
                }),
            )
        }
    }
}
