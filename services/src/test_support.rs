//! Shared fixtures for the service tests.

use crate::attendance_record::AttendanceRecordService;
use crate::attendance_session::AttendanceSessionService;
use crate::directory::{
    ClassMemberDirectory, ClassOwnershipDirectory, DirectoryError, EnrollmentDirectory,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use db::models::attendance_record::Model as AttendanceRecord;
use db::models::attendance_session::Model as AttendanceSession;
use db::models::class_member::{Model as ClassMember, Role};
use db::repositories::{
    AttendanceLedger, AttendanceRepository, InsertOutcome, NewRecord, NewSession,
    SessionRepository, SessionStore,
};
use db::test_utils::setup_test_db;
use sea_orm::DbErr;
use std::sync::Arc;
use util::clock::ManualClock;
use util::config::SessionPolicy;
use util::ids::RandomIds;
use util::policy::UniquenessPolicy;

pub const TEACHER: i64 = 1;
pub const OTHER_TEACHER: i64 = 2;
pub const CLASS: i64 = 100;
pub const SECOND_CLASS: i64 = 101;
pub const OTHER_CLASS: i64 = 200;
pub const STUDENT: i64 = 10;
pub const STUDENT_2: i64 = 11;
pub const STUDENT_3: i64 = 12;
pub const OUTSIDER: i64 = 13;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub session_store: Arc<dyn SessionStore>,
    pub ledger: Arc<dyn AttendanceLedger>,
    pub sessions: Arc<AttendanceSessionService>,
    pub records: AttendanceRecordService,
}

struct Overrides {
    policy: UniquenessPolicy,
    wrap_store: Box<dyn FnOnce(Arc<dyn SessionStore>) -> Arc<dyn SessionStore>>,
    wrap_ledger: Box<dyn FnOnce(Arc<dyn AttendanceLedger>) -> Arc<dyn AttendanceLedger>>,
    owners: Option<Arc<dyn ClassOwnershipDirectory>>,
    enrollment: Option<Arc<dyn EnrollmentDirectory>>,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            policy: UniquenessPolicy::PerSession,
            wrap_store: Box::new(|store| store),
            wrap_ledger: Box::new(|ledger| ledger),
            owners: None,
            enrollment: None,
        }
    }
}

async fn build(overrides: Overrides) -> Harness {
    let db = setup_test_db().await;

    ClassMember::assign(&db, TEACHER, CLASS, Role::Teacher).await.unwrap();
    ClassMember::assign(&db, TEACHER, SECOND_CLASS, Role::Teacher).await.unwrap();
    ClassMember::assign(&db, OTHER_TEACHER, OTHER_CLASS, Role::Teacher).await.unwrap();
    for student in [STUDENT, STUDENT_2, STUDENT_3] {
        ClassMember::assign(&db, student, CLASS, Role::Student).await.unwrap();
    }

    let clock = Arc::new(ManualClock::new(t0()));
    let directory = Arc::new(ClassMemberDirectory::new(db.clone()));
    let owners = overrides
        .owners
        .unwrap_or_else(|| directory.clone() as Arc<dyn ClassOwnershipDirectory>);
    let enrollment = overrides
        .enrollment
        .unwrap_or_else(|| directory.clone() as Arc<dyn EnrollmentDirectory>);

    let session_store =
        (overrides.wrap_store)(Arc::new(SessionRepository::new(db.clone())) as Arc<dyn SessionStore>);
    let ledger = (overrides.wrap_ledger)(
        Arc::new(AttendanceRepository::new(db.clone())) as Arc<dyn AttendanceLedger>
    );

    let sessions = Arc::new(AttendanceSessionService::new(
        session_store.clone(),
        owners.clone(),
        clock.clone(),
        Arc::new(RandomIds),
        SessionPolicy::default(),
    ));
    let records = AttendanceRecordService::new(
        sessions.clone(),
        ledger.clone(),
        enrollment,
        owners,
        clock.clone(),
        overrides.policy,
    );

    Harness {
        clock,
        session_store,
        ledger,
        sessions,
        records,
    }
}

pub async fn harness() -> Harness {
    build(Overrides::default()).await
}

pub async fn harness_with_policy(policy: UniquenessPolicy) -> Harness {
    build(Overrides {
        policy,
        ..Default::default()
    })
    .await
}

pub async fn harness_with_store<F>(wrap: F) -> Harness
where
    F: FnOnce(Arc<dyn SessionStore>) -> Arc<dyn SessionStore> + 'static,
{
    build(Overrides {
        wrap_store: Box::new(wrap),
        ..Default::default()
    })
    .await
}

pub async fn harness_with_ledger<F>(wrap: F) -> Harness
where
    F: FnOnce(Arc<dyn AttendanceLedger>) -> Arc<dyn AttendanceLedger> + 'static,
{
    build(Overrides {
        wrap_ledger: Box::new(wrap),
        ..Default::default()
    })
    .await
}

pub async fn harness_with_directory(owners: Arc<dyn ClassOwnershipDirectory>) -> Harness {
    build(Overrides {
        owners: Some(owners),
        ..Default::default()
    })
    .await
}

pub async fn harness_with_enrollment(enrollment: Arc<dyn EnrollmentDirectory>) -> Harness {
    build(Overrides {
        enrollment: Some(enrollment),
        ..Default::default()
    })
    .await
}

/// A directory whose backend is down.
pub struct UnavailableDirectory;

#[async_trait]
impl EnrollmentDirectory for UnavailableDirectory {
    async fn is_enrolled(&self, _: i64, _: i64) -> Result<bool, DirectoryError> {
        Err(DirectoryError::new("enrollment directory", "connection refused"))
    }
}

#[async_trait]
impl ClassOwnershipDirectory for UnavailableDirectory {
    async fn is_owner(&self, _: i64, _: i64) -> Result<bool, DirectoryError> {
        Err(DirectoryError::new("class ownership directory", "connection refused"))
    }
}

/// Delegates to a real store, except that every rotation loses its race.
pub struct AlwaysLosesRace(pub Arc<dyn SessionStore>);

#[async_trait]
impl SessionStore for AlwaysLosesRace {
    async fn insert(&self, session: NewSession) -> Result<AttendanceSession, DbErr> {
        self.0.insert(session).await
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<AttendanceSession>, DbErr> {
        self.0.find_by_session_id(session_id).await
    }

    async fn find_active_by_token(&self, token: &str) -> Result<Option<AttendanceSession>, DbErr> {
        self.0.find_active_by_token(token).await
    }

    async fn find_active_by_previous_token(
        &self,
        token: &str,
    ) -> Result<Option<AttendanceSession>, DbErr> {
        self.0.find_active_by_previous_token(token).await
    }

    async fn find_active_by_owner(
        &self,
        owner_teacher_id: i64,
        class_id: Option<i64>,
    ) -> Result<Vec<AttendanceSession>, DbErr> {
        self.0.find_active_by_owner(owner_teacher_id, class_id).await
    }

    async fn rotate(
        &self,
        _current: &AttendanceSession,
        _token: String,
        _issued_at: DateTime<Utc>,
    ) -> Result<Option<AttendanceSession>, DbErr> {
        Ok(None)
    }

    async fn terminate(&self, session: &AttendanceSession, at: DateTime<Utc>) -> Result<bool, DbErr> {
        self.0.terminate(session, at).await
    }

    async fn terminate_expired(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        self.0.terminate_expired(now).await
    }

    async fn delete_terminated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        self.0.delete_terminated_before(cutoff).await
    }
}

/// Delegates to a real ledger, except that every insert hits a storage fault.
pub struct FailingInserts(pub Arc<dyn AttendanceLedger>);

fn storage_fault() -> DbErr {
    DbErr::Custom("disk I/O error at /var/lib/attendance.db".into())
}

#[async_trait]
impl AttendanceLedger for FailingInserts {
    async fn insert_if_absent(&self, _record: NewRecord) -> Result<InsertOutcome, DbErr> {
        Err(storage_fault())
    }

    async fn insert_if_day_free(&self, _record: NewRecord) -> Result<InsertOutcome, DbErr> {
        Err(storage_fault())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AttendanceRecord>, DbErr> {
        self.0.find_by_id(id).await
    }

    async fn list_for_class(&self, class_id: i64) -> Result<Vec<AttendanceRecord>, DbErr> {
        self.0.list_for_class(class_id).await
    }

    async fn count_for_session(&self, session_id: &str) -> Result<u64, DbErr> {
        self.0.count_for_session(session_id).await
    }

    async fn update_correction(
        &self,
        record: &AttendanceRecord,
        notes: Option<String>,
        schedule_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord, DbErr> {
        self.0.update_correction(record, notes, schedule_id, at).await
    }
}
