use chrono::{DateTime, Utc};
use db::models::attendance_record::{Model as RecordModel, VerificationMethod};
use db::models::attendance_session::{Model as SessionModel, SessionStatus};
use serde::{Deserialize, Serialize};
use services::attendance_record::{Coordinates, ManualFailure, ManualMarkResult};
use services::attendance_session::CreatedSession;
use validator::Validate;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionReq {
    pub class_id: i64,
    #[validate(range(min = 1, message = "durationMinutes must be a positive integer"))]
    pub duration_minutes: Option<u32>,
    pub schedule_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdReq {
    #[validate(length(min = 1, message = "sessionId is required"))]
    pub session_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenReq {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct CoordinatesReq {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be within [-180, 180]"))]
    pub longitude: f64,
}

impl From<CoordinatesReq> for Coordinates {
    fn from(c: CoordinatesReq) -> Self {
        Coordinates {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendanceReq {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    /// Defaults to the caller; a different id is rejected.
    pub student_id: Option<i64>,
    #[validate(nested)]
    pub coordinates: Option<CoordinatesReq>,
    #[serde(default)]
    pub proof_of_liveness: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualAttendanceReq {
    pub class_id: i64,
    #[validate(length(min = 1, message = "studentIds must not be empty"))]
    pub student_ids: Vec<i64>,
    pub schedule_id: Option<i64>,
    #[validate(length(max = 1000, message = "notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceReq {
    #[validate(length(max = 1000, message = "notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    pub schedule_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub class_id: i64,
    pub schedule_id: Option<i64>,
    pub current_token: String,
    pub token_issued_at: DateTime<Utc>,
    pub session_expires_at: DateTime<Utc>,
    pub poll_interval_seconds: i64,
}

impl From<CreatedSession> for CreateSessionResponse {
    fn from(created: CreatedSession) -> Self {
        let s = created.session;
        Self {
            session_id: s.session_id,
            class_id: s.class_id,
            schedule_id: s.schedule_id,
            current_token: s.current_token,
            token_issued_at: s.token_issued_at,
            session_expires_at: s.session_expires_at,
            poll_interval_seconds: created.poll_interval_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub class_id: i64,
    pub schedule_id: Option<i64>,
    pub current_token: String,
    pub token_issued_at: DateTime<Utc>,
    pub session_expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<SessionModel> for SessionResponse {
    fn from(m: SessionModel) -> Self {
        Self {
            session_id: m.session_id,
            class_id: m.class_id,
            schedule_id: m.schedule_id,
            current_token: m.current_token,
            token_issued_at: m.token_issued_at,
            session_expires_at: m.session_expires_at,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedResponse {
    pub terminated_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    pub session_id: Option<String>,
    pub schedule_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub verification_method: VerificationMethod,
    pub manual_entry: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecordModel> for RecordResponse {
    fn from(m: RecordModel) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            class_id: m.class_id,
            session_id: m.session_id,
            schedule_id: m.schedule_id,
            timestamp: m.timestamp,
            verification_method: m.verification_method,
            manual_entry: m.manual_entry,
            latitude: m.latitude,
            longitude: m.longitude,
            notes: m.notes,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct ManualMarkResponse {
    pub succeeded: Vec<RecordResponse>,
    pub failed: Vec<ManualFailure>,
}

impl From<ManualMarkResult> for ManualMarkResponse {
    fn from(result: ManualMarkResult) -> Self {
        Self {
            succeeded: result.succeeded.into_iter().map(RecordResponse::from).collect(),
            failed: result.failed,
        }
    }
}
