use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use services::AttendanceError;
use services::attendance_record::AttendanceCorrection;
use validator::Validate;

use super::common::{RecordResponse, UpdateAttendanceReq};
use crate::auth::AuthUser;
use crate::response::{ApiError, ApiResponse};
use crate::routes::common::format_validation_errors;
use crate::state::AppState;

/// PUT /api/attendance/records/{record_id}
///
/// Teacher correction of `notes` and/or `scheduleId`. Every change is written
/// to the `audit` log target. Records of classes the caller does not own are
/// reported as `404`.
pub async fn update_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
    Json(body): Json<UpdateAttendanceReq>,
) -> Result<(StatusCode, Json<ApiResponse<RecordResponse>>), ApiError> {
    body.validate()
        .map_err(|e| AttendanceError::InvalidInput(format_validation_errors(&e)))?;

    let updated = state
        .records()
        .update_attendance(
            user.id(),
            record_id,
            AttendanceCorrection {
                notes: body.notes,
                schedule_id: body.schedule_id,
            },
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            RecordResponse::from(updated),
            "Attendance record updated",
        )),
    ))
}
