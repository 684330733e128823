use chrono::{DateTime, Duration, Utc};
use db::models::attendance_session::Model as AttendanceSession;
use util::ids::IdProvider;

/// A token about to replace a session's current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// Produces the next credential for `session`.
///
/// `issued_at` is strictly later than the session's current `token_issued_at`
/// even if the clock reads the same instant twice or steps backwards, which
/// keeps rotations ordered per session.
pub fn next_token(
    session: &AttendanceSession,
    ids: &dyn IdProvider,
    now: DateTime<Utc>,
) -> RotatedToken {
    let floor = session.token_issued_at + Duration::microseconds(1);
    RotatedToken {
        token: ids.token(),
        issued_at: now.max(floor),
    }
}
