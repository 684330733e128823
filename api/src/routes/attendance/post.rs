use axum::{Extension, Json, extract::State, http::StatusCode};
use services::AttendanceError;
use services::attendance_record::{ManualAttendance, SubmitAttendance};
use services::attendance_session::{CreateSession, RotatedSession, ValidatedSession};
use validator::Validate;

use super::common::{
    CreateSessionReq, CreateSessionResponse, ManualAttendanceReq, ManualMarkResponse,
    RecordResponse, SessionIdReq, SubmitAttendanceReq, TerminatedResponse, ValidateTokenReq,
};
use crate::auth::AuthUser;
use crate::response::{ApiError, ApiResponse};
use crate::routes::common::format_validation_errors;
use crate::state::AppState;

type Reply<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn check<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate()
        .map_err(|e| ApiError(AttendanceError::InvalidInput(format_validation_errors(&e))))
}

/// POST /api/attendance/sessions
///
/// Opens a QR session for one of the caller's classes. Any live session the
/// caller already has for that class is terminated.
///
/// ### Request Body
/// ```json
/// { "classId": 12, "durationMinutes": 10, "scheduleId": 4 }
/// ```
///
/// ### Responses
/// - `201 Created` with `{ sessionId, currentToken, sessionExpiresAt, pollIntervalSeconds, ... }`
/// - `400` invalid duration, `403` not the class owner, `503` roster unavailable
pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateSessionReq>,
) -> Reply<CreateSessionResponse> {
    check(&body)?;

    let created = state
        .sessions()
        .create_session(CreateSession {
            owner_teacher_id: user.id(),
            class_id: body.class_id,
            duration_minutes: body.duration_minutes,
            schedule_id: body.schedule_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            CreateSessionResponse::from(created),
            "Attendance session created",
        )),
    ))
}

/// POST /api/attendance/sessions/rotate
///
/// Called by the teacher's display every poll interval. `404` covers a
/// missing, foreign, terminated or lapsed session alike.
pub async fn rotate_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SessionIdReq>,
) -> Reply<RotatedSession> {
    check(&body)?;
    let rotated = state
        .sessions()
        .rotate_token(&body.session_id, user.id())
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(rotated, "QR token refreshed")),
    ))
}

/// POST /api/attendance/sessions/terminate
pub async fn terminate_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SessionIdReq>,
) -> Reply<TerminatedResponse> {
    check(&body)?;
    let terminated_count = state
        .sessions()
        .terminate(&body.session_id, user.id())
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            TerminatedResponse { terminated_count },
            "Attendance session terminated",
        )),
    ))
}

/// POST /api/attendance/sessions/terminate-all
pub async fn terminate_all_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Reply<TerminatedResponse> {
    let terminated_count = state.sessions().terminate_all(user.id()).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            TerminatedResponse { terminated_count },
            format!("Terminated {terminated_count} attendance session(s)"),
        )),
    ))
}

/// POST /api/attendance/validate
///
/// Lets the student app check a scanned code before running the liveness
/// step. Errors carry `error_kind` (`expired`, `token_superseded`,
/// `invalid_or_expired_session`) so the app can tell the user what to do.
pub async fn validate_token(
    State(state): State<AppState>,
    Json(body): Json<ValidateTokenReq>,
) -> Reply<ValidatedSession> {
    check(&body)?;
    let validated = state
        .sessions()
        .validate(&body.token, body.session_id.as_deref())
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(validated, "QR code is valid")),
    ))
}

/// POST /api/attendance/submit
///
/// ### Request Body
/// ```json
/// {
///   "token": "9f2c...",
///   "coordinates": { "latitude": -25.75, "longitude": 28.23 },
///   "proofOfLiveness": true
/// }
/// ```
///
/// ### Responses
/// - `201 Created` with the attendance record
/// - `409` with `error_kind = already_recorded` when this student is already marked
/// - `410` when the code is stale, `400` when it is unknown
pub async fn submit_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SubmitAttendanceReq>,
) -> Reply<RecordResponse> {
    check(&body)?;
    if body.student_id.is_some_and(|id| id != user.id()) {
        return Err(AttendanceError::Unauthorized.into());
    }

    let record = state
        .records()
        .submit(SubmitAttendance {
            token: body.token,
            student_id: user.id(),
            coordinates: body.coordinates.map(Into::into),
            proof_of_liveness: body.proof_of_liveness,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            RecordResponse::from(record),
            "Attendance marked successfully",
        )),
    ))
}

/// POST /api/attendance/manual
///
/// Marks several students present at once. The batch is never all-or-nothing:
/// the response lists who succeeded and why each other student failed.
///
/// - `201 Created` when at least one student was marked
/// - `400 Bad Request` when none were (same body shape)
pub async fn mark_manual(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ManualAttendanceReq>,
) -> Reply<ManualMarkResponse> {
    check(&body)?;

    let result = state
        .records()
        .mark_manual(ManualAttendance {
            teacher_id: user.id(),
            class_id: body.class_id,
            student_ids: body.student_ids,
            schedule_id: body.schedule_id,
            notes: body.notes,
        })
        .await?;

    let marked = result.succeeded.len();
    let failed = result.failed.len();
    let message = format!("Marked {marked} student(s), {failed} failed");
    let data = ManualMarkResponse::from(result);

    if marked == 0 {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                data,
                message,
                error_kind: None,
            }),
        ));
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::success(data, message))))
}
