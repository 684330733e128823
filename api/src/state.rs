use db::repositories::{AttendanceRepository, SessionRepository};
use sea_orm::DatabaseConnection;
use services::attendance_record::AttendanceRecordService;
use services::attendance_session::AttendanceSessionService;
use services::directory::ClassMemberDirectory;
use std::sync::Arc;
use util::clock::{Clock, SystemClock};
use util::config::{AppConfig, SessionPolicy};
use util::ids::{IdProvider, RandomIds};
use util::policy::UniquenessPolicy;

/// Everything handlers need, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    sessions: Arc<AttendanceSessionService>,
    records: Arc<AttendanceRecordService>,
}

impl AppState {
    /// Wires the services against the database-backed stores and the
    /// `class_members` roster.
    pub fn new(
        db: DatabaseConnection,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
        session_policy: SessionPolicy,
        uniqueness: UniquenessPolicy,
    ) -> Self {
        let directory = Arc::new(ClassMemberDirectory::new(db.clone()));

        let sessions = Arc::new(AttendanceSessionService::new(
            Arc::new(SessionRepository::new(db.clone())),
            directory.clone(),
            clock.clone(),
            ids,
            session_policy,
        ));
        let records = Arc::new(AttendanceRecordService::new(
            sessions.clone(),
            Arc::new(AttendanceRepository::new(db.clone())),
            directory.clone(),
            directory,
            clock,
            uniqueness,
        ));

        Self {
            db,
            sessions,
            records,
        }
    }

    pub fn from_config(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self::new(
            db,
            Arc::new(SystemClock),
            Arc::new(RandomIds),
            config.session_policy(),
            config.uniqueness_policy,
        )
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn sessions(&self) -> &AttendanceSessionService {
        &self.sessions
    }

    pub fn records(&self) -> &AttendanceRecordService {
        &self.records
    }
}
