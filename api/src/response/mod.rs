use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use services::AttendanceError;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// ```json
/// {
///   "success": false,
///   "data": {},
///   "message": "QR code has expired. Please scan the code currently on screen.",
///   "error_kind": "expired"
/// }
/// ```
///
/// `error_kind` is only present on failures that come from the attendance
/// protocol; clients switch on it instead of parsing `message`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            error_kind: None,
        }
    }

    /// Error response with default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
            error_kind: None,
        }
    }

    pub fn error_with_kind(kind: &'static str, message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            error_kind: Some(kind),
            ..Self::error(message)
        }
    }
}

#[derive(Serialize, Default)]
pub struct Empty {}

/// An attendance failure on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AttendanceError);

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

pub fn status_for(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::Unauthorized
        | AttendanceError::NotEnrolled
        | AttendanceError::LivenessNotVerified => StatusCode::FORBIDDEN,
        AttendanceError::NotFound => StatusCode::NOT_FOUND,
        AttendanceError::InvalidOrExpiredSession | AttendanceError::InvalidInput(_) => {
            StatusCode::BAD_REQUEST
        }
        AttendanceError::Expired | AttendanceError::TokenSuperseded => StatusCode::GONE,
        AttendanceError::AlreadyRecorded | AttendanceError::Conflict => StatusCode::CONFLICT,
        AttendanceError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AttendanceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AttendanceError::Database(err) = &self.0 {
            tracing::error!(error = %err, "Attendance storage failure");
        }
        let message = self.0.client_message();

        (
            status,
            Json(ApiResponse::<Empty>::error_with_kind(self.0.kind(), message)),
        )
            .into_response()
    }
}
