use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::common::{RecordResponse, SessionResponse};
use crate::auth::AuthUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// GET /api/attendance/sessions/active
///
/// The caller's live sessions, newest first. Sessions that lapsed since the
/// last look are closed on the way.
pub async fn list_active_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<SessionResponse>>>), ApiError> {
    let sessions = state.sessions().list_active(user.id()).await?;
    let data: Vec<SessionResponse> = sessions.into_iter().map(SessionResponse::from).collect();
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(data, "Active sessions retrieved")),
    ))
}

/// GET /api/attendance/classes/{class_id}/records
pub async fn list_class_records(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(class_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<RecordResponse>>>), ApiError> {
    let records = state.records().list_for_class(user.id(), class_id).await?;
    let data: Vec<RecordResponse> = records.into_iter().map(RecordResponse::from).collect();
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(data, "Attendance records retrieved")),
    ))
}
