use sea_orm::DbErr;

/// Everything the attendance protocol can refuse with.
///
/// Messages are meant for people; `kind()` is meant for client code. Neither
/// says *why* a session lookup failed for someone who does not own it.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("You are not allowed to do this")]
    Unauthorized,

    #[error("Student is not enrolled in this class")]
    NotEnrolled,

    #[error("Identity and liveness have not been verified")]
    LivenessNotVerified,

    #[error("Attendance session not found")]
    NotFound,

    #[error("QR code is invalid or the session has ended. Please scan a new QR code.")]
    InvalidOrExpiredSession,

    #[error("QR code has expired. Please scan the code currently on screen.")]
    Expired,

    #[error("QR code was just replaced. Please scan again.")]
    TokenSuperseded,

    #[error("Attendance already recorded")]
    AlreadyRecorded,

    #[error("The session was modified concurrently, please retry")]
    Conflict,

    #[error("{0} is unavailable")]
    UpstreamUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AttendanceError {
    /// Stable identifier clients switch on.
    pub fn kind(&self) -> &'static str {
        match self {
            AttendanceError::Unauthorized => "unauthorized",
            AttendanceError::NotEnrolled => "not_enrolled",
            AttendanceError::LivenessNotVerified => "liveness_not_verified",
            AttendanceError::NotFound => "not_found",
            AttendanceError::InvalidOrExpiredSession => "invalid_or_expired_session",
            AttendanceError::Expired => "expired",
            AttendanceError::TokenSuperseded => "token_superseded",
            AttendanceError::AlreadyRecorded => "already_recorded",
            AttendanceError::Conflict => "conflict",
            AttendanceError::UpstreamUnavailable(_) => "upstream_unavailable",
            AttendanceError::InvalidInput(_) => "invalid_input",
            AttendanceError::Database(_) => "storage_error",
        }
    }

    /// Only transient failures may be retried by the caller. Retrying a
    /// submission is safe because the ledger insert is idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttendanceError::Conflict
                | AttendanceError::UpstreamUnavailable(_)
                | AttendanceError::Database(_)
        )
    }

    /// `AlreadyRecorded` is a benign terminal outcome, not a fault.
    pub fn is_benign(&self) -> bool {
        matches!(self, AttendanceError::AlreadyRecorded)
    }

    /// The message shown to callers. Storage details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AttendanceError::Database(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }
}
