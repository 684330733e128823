//! QR attendance session lifecycle: create, rotate, validate, terminate.
//!
//! All mutations go through the store's conditional writes, so any number of
//! handlers may call into one service concurrently without further locking.

use crate::directory::ClassOwnershipDirectory;
use crate::error::AttendanceError;
use crate::token_rotator::next_token;
use chrono::{DateTime, Duration, Utc};
use db::models::attendance_session::Model as AttendanceSession;
use db::repositories::{NewSession, SessionStore};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use util::clock::Clock;
use util::config::SessionPolicy;
use util::ids::IdProvider;

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub owner_teacher_id: i64,
    pub class_id: i64,
    /// Falls back to the configured default when absent.
    pub duration_minutes: Option<u32>,
    pub schedule_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: AttendanceSession,
    pub poll_interval_seconds: i64,
    /// Earlier live sessions of the same teacher and class that were closed.
    pub superseded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatedSession {
    pub current_token: String,
    pub token_issued_at: DateTime<Utc>,
}

/// What a successful `validate` resolves a token to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedSession {
    pub session_id: String,
    pub class_id: i64,
    pub schedule_id: Option<i64>,
    pub teacher_id: i64,
}

impl From<&AttendanceSession> for ValidatedSession {
    fn from(session: &AttendanceSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            class_id: session.class_id,
            schedule_id: session.schedule_id,
            teacher_id: session.owner_teacher_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReapResult {
    pub expired: u64,
    pub deleted: u64,
}

pub struct AttendanceSessionService {
    store: Arc<dyn SessionStore>,
    owners: Arc<dyn ClassOwnershipDirectory>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
    policy: SessionPolicy,
}

/// Rotations attempt their write at most this many times.
const WRITE_ATTEMPTS: usize = 2;

/// Creations race every other create for the same teacher and class.
const CREATE_ATTEMPTS: usize = 3;

impl AttendanceSessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        owners: Arc<dyn ClassOwnershipDirectory>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            owners,
            clock,
            ids,
            policy,
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Opens a new session for a class, closing any other live session the
    /// same teacher still has for it.
    pub async fn create_session(
        &self,
        params: CreateSession,
    ) -> Result<CreatedSession, AttendanceError> {
        let minutes = params
            .duration_minutes
            .unwrap_or(self.policy.default_duration_minutes);
        if minutes == 0 {
            return Err(AttendanceError::InvalidInput(
                "durationMinutes must be a positive integer".into(),
            ));
        }
        if minutes > self.policy.max_duration_minutes {
            return Err(AttendanceError::InvalidInput(format!(
                "durationMinutes must not exceed {}",
                self.policy.max_duration_minutes
            )));
        }

        if !self
            .owners
            .is_owner(params.owner_teacher_id, params.class_id)
            .await?
        {
            return Err(AttendanceError::Unauthorized);
        }

        let now = self.clock.now();
        let mut superseded = 0;
        let mut attempt = 0;
        let session = loop {
            attempt += 1;
            superseded += self
                .close_live_sessions(params.owner_teacher_id, params.class_id, now)
                .await?;

            let new = NewSession {
                session_id: self.ids.session_id(),
                class_id: params.class_id,
                owner_teacher_id: params.owner_teacher_id,
                schedule_id: params.schedule_id,
                token: self.ids.token(),
                issued_at: now,
                expires_at: now + Duration::minutes(i64::from(minutes)),
            };
            match self.store.insert(new).await {
                Ok(session) => break session,
                // A concurrent create took the live slot, or an identifier
                // collided. Close whatever is live and draw fresh ids.
                Err(err) if is_unique_violation(&err) && attempt < CREATE_ATTEMPTS => {
                    debug!(
                        class_id = params.class_id,
                        teacher_id = params.owner_teacher_id,
                        attempt,
                        "Session insert collided, retrying"
                    );
                    continue;
                }
                Err(err) if is_unique_violation(&err) => return Err(AttendanceError::Conflict),
                Err(err) => return Err(err.into()),
            }
        };

        info!(
            session_id = %session.session_id,
            class_id = session.class_id,
            teacher_id = session.owner_teacher_id,
            expires_at = %session.session_expires_at,
            superseded,
            "Attendance session created"
        );

        Ok(CreatedSession {
            session,
            poll_interval_seconds: self.policy.poll_interval.num_seconds(),
            superseded,
        })
    }

    /// Terminates the teacher's live sessions for a class; returns how many.
    async fn close_live_sessions(
        &self,
        owner_teacher_id: i64,
        class_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, AttendanceError> {
        let mut closed = 0;
        for existing in self
            .store
            .find_active_by_owner(owner_teacher_id, Some(class_id))
            .await?
        {
            if self.store.terminate(&existing, now).await? {
                closed += 1;
            }
        }
        Ok(closed)
    }

    /// Replaces the session's token. Only the owner of a live session may
    /// rotate; every other case is reported as `NotFound`.
    pub async fn rotate_token(
        &self,
        session_id: &str,
        caller_teacher_id: i64,
    ) -> Result<RotatedSession, AttendanceError> {
        for attempt in 1..=WRITE_ATTEMPTS {
            let now = self.clock.now();
            let session = self.owned_live_session(session_id, caller_teacher_id, now).await?;
            let next = next_token(&session, self.ids.as_ref(), now);

            match self.store.rotate(&session, next.token, next.issued_at).await {
                Ok(Some(rotated)) => {
                    debug!(session_id, version = rotated.version, "Token rotated");
                    return Ok(RotatedSession {
                        current_token: rotated.current_token,
                        token_issued_at: rotated.token_issued_at,
                    });
                }
                Ok(None) => {
                    debug!(session_id, attempt, "Token rotation lost a race");
                }
                Err(err) if is_unique_violation(&err) => {
                    debug!(session_id, attempt, "Generated token collided");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(session_id, "Token rotation gave up after concurrent updates");
        Err(AttendanceError::Conflict)
    }

    /// Resolves a scanned token to the session it belongs to.
    ///
    /// A token that was current until the latest rotation is still accepted
    /// inside the grace window and reported as superseded after it, so the
    /// client can tell "scan again" apart from "this code means nothing".
    pub async fn validate(
        &self,
        token: &str,
        expected_session_id: Option<&str>,
    ) -> Result<ValidatedSession, AttendanceError> {
        let now = self.clock.now();
        let grace = self.policy.token_grace;

        let result = if let Some(session) = self.store.find_active_by_token(token).await? {
            if session.is_expired_at(now) {
                self.expire(&session, now).await?;
                Err(AttendanceError::InvalidOrExpiredSession)
            } else if session.token_age(now) > grace {
                Err(AttendanceError::Expired)
            } else {
                Ok(session)
            }
        } else if let Some(session) = self.store.find_active_by_previous_token(token).await? {
            let issued = session
                .previous_token_issued_at
                .unwrap_or(session.token_issued_at);
            if session.is_expired_at(now) {
                self.expire(&session, now).await?;
                Err(AttendanceError::InvalidOrExpiredSession)
            } else if now - issued > grace {
                Err(AttendanceError::TokenSuperseded)
            } else {
                Ok(session)
            }
        } else {
            Err(AttendanceError::InvalidOrExpiredSession)
        };

        let session = result?;
        if expected_session_id.is_some_and(|id| id != session.session_id) {
            return Err(AttendanceError::InvalidOrExpiredSession);
        }
        Ok(ValidatedSession::from(&session))
    }

    /// Ends one of the caller's sessions. Unknown, foreign or already ended
    /// sessions yield a count of zero rather than an error.
    pub async fn terminate(
        &self,
        session_id: &str,
        caller_teacher_id: i64,
    ) -> Result<u64, AttendanceError> {
        let Some(session) = self.store.find_by_session_id(session_id).await? else {
            return Ok(0);
        };
        if session.owner_teacher_id != caller_teacher_id || !session.is_active() {
            return Ok(0);
        }

        let terminated = self.store.terminate(&session, self.clock.now()).await?;
        if terminated {
            info!(session_id, teacher_id = caller_teacher_id, "Attendance session terminated");
        }
        Ok(u64::from(terminated))
    }

    pub async fn terminate_all(&self, caller_teacher_id: i64) -> Result<u64, AttendanceError> {
        let now = self.clock.now();
        let mut count = 0;
        for session in self.store.find_active_by_owner(caller_teacher_id, None).await? {
            if self.store.terminate(&session, now).await? {
                count += 1;
            }
        }
        info!(teacher_id = caller_teacher_id, count, "Terminated all attendance sessions");
        Ok(count)
    }

    /// The caller's live sessions, newest first.
    pub async fn list_active(
        &self,
        caller_teacher_id: i64,
    ) -> Result<Vec<AttendanceSession>, AttendanceError> {
        let now = self.clock.now();
        let mut live = Vec::new();
        for session in self.store.find_active_by_owner(caller_teacher_id, None).await? {
            if session.is_expired_at(now) {
                self.expire(&session, now).await?;
            } else {
                live.push(session);
            }
        }
        Ok(live)
    }

    /// Closes lapsed sessions and deletes those that ended more than
    /// `retention` ago. Attendance records are left untouched.
    pub async fn reap_expired(&self, retention: Duration) -> Result<ReapResult, AttendanceError> {
        let now = self.clock.now();
        let expired = self.store.terminate_expired(now).await?;
        let deleted = self.store.delete_terminated_before(now - retention).await?;
        if expired > 0 || deleted > 0 {
            info!(expired, deleted, "Reaped attendance sessions");
        }
        Ok(ReapResult { expired, deleted })
    }

    async fn owned_live_session(
        &self,
        session_id: &str,
        caller_teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSession, AttendanceError> {
        let session = self
            .store
            .find_by_session_id(session_id)
            .await?
            .filter(|s| s.owner_teacher_id == caller_teacher_id && s.is_active())
            .ok_or(AttendanceError::NotFound)?;

        if session.is_expired_at(now) {
            self.expire(&session, now).await?;
            return Err(AttendanceError::NotFound);
        }
        Ok(session)
    }

    async fn expire(&self, session: &AttendanceSession, now: DateTime<Utc>) -> Result<(), DbErr> {
        if self.store.terminate(session, now).await? {
            debug!(session_id = %session.session_id, "Lapsed session marked terminated");
        }
        Ok(())
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
