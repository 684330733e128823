//! Turns validated scans and teacher entries into attendance records.

use crate::attendance_session::AttendanceSessionService;
use crate::directory::{ClassOwnershipDirectory, EnrollmentDirectory};
use crate::error::AttendanceError;
use db::models::attendance_record::{Model as AttendanceRecord, VerificationMethod};
use db::repositories::{AttendanceLedger, InsertOutcome, NewRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use util::clock::Clock;
use util::policy::{UniquenessPolicy, day_key};

pub const DEFAULT_MANUAL_NOTES: &str = "Manual attendance entry by teacher";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct SubmitAttendance {
    pub token: String,
    pub student_id: i64,
    pub coordinates: Option<Coordinates>,
    /// Supplied by the identity/liveness check that ran before this call.
    pub proof_of_liveness: bool,
}

#[derive(Debug, Clone)]
pub struct ManualAttendance {
    pub teacher_id: i64,
    pub class_id: i64,
    pub student_ids: Vec<i64>,
    pub schedule_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualFailure {
    pub student_id: i64,
    pub error_kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManualMarkResult {
    pub succeeded: Vec<AttendanceRecord>,
    pub failed: Vec<ManualFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceCorrection {
    pub notes: Option<String>,
    pub schedule_id: Option<i64>,
}

pub struct AttendanceRecordService {
    sessions: Arc<AttendanceSessionService>,
    ledger: Arc<dyn AttendanceLedger>,
    enrollment: Arc<dyn EnrollmentDirectory>,
    owners: Arc<dyn ClassOwnershipDirectory>,
    clock: Arc<dyn Clock>,
    uniqueness: UniquenessPolicy,
}

impl AttendanceRecordService {
    pub fn new(
        sessions: Arc<AttendanceSessionService>,
        ledger: Arc<dyn AttendanceLedger>,
        enrollment: Arc<dyn EnrollmentDirectory>,
        owners: Arc<dyn ClassOwnershipDirectory>,
        clock: Arc<dyn Clock>,
        uniqueness: UniquenessPolicy,
    ) -> Self {
        Self {
            sessions,
            ledger,
            enrollment,
            owners,
            clock,
            uniqueness,
        }
    }

    /// Records a student's QR scan. At most one record per dedup key ever
    /// exists, however many identical submissions race.
    pub async fn submit(&self, params: SubmitAttendance) -> Result<AttendanceRecord, AttendanceError> {
        if !params.proof_of_liveness {
            return Err(AttendanceError::LivenessNotVerified);
        }

        let session = self.sessions.validate(&params.token, None).await?;

        if !self
            .enrollment
            .is_enrolled(params.student_id, session.class_id)
            .await?
        {
            return Err(AttendanceError::NotEnrolled);
        }

        let now = self.clock.now();
        let record = NewRecord {
            student_id: params.student_id,
            class_id: session.class_id,
            session_id: Some(session.session_id.clone()),
            schedule_id: session.schedule_id,
            timestamp: now,
            verification_method: VerificationMethod::QrFace,
            latitude: params.coordinates.map(|c| c.latitude),
            longitude: params.coordinates.map(|c| c.longitude),
            notes: None,
            dedup_key: self.uniqueness.dedup_key(
                params.student_id,
                session.class_id,
                Some(&session.session_id),
                now,
            ),
            day_key: day_key(params.student_id, session.class_id, now),
        };

        let saved = self.record_once(record).await?;
        info!(
            student_id = saved.student_id,
            class_id = saved.class_id,
            session_id = %session.session_id,
            "Attendance recorded"
        );
        Ok(saved)
    }

    /// Marks a batch of students present. Each student succeeds or fails on
    /// its own; only a caller who does not own the class aborts the batch.
    pub async fn mark_manual(
        &self,
        params: ManualAttendance,
    ) -> Result<ManualMarkResult, AttendanceError> {
        if params.student_ids.is_empty() {
            return Err(AttendanceError::InvalidInput(
                "studentIds must not be empty".into(),
            ));
        }
        self.require_owner(params.teacher_id, params.class_id).await?;

        let notes = params
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MANUAL_NOTES.to_string());

        let mut result = ManualMarkResult::default();
        for student_id in params.student_ids {
            match self
                .mark_one(student_id, params.class_id, params.schedule_id, &notes)
                .await
            {
                Ok(record) => result.succeeded.push(record),
                Err(err) => {
                    if err.is_benign() {
                        debug!(student_id, kind = err.kind(), "Manual attendance skipped");
                    } else {
                        warn!(student_id, kind = err.kind(), error = %err, "Manual attendance failed");
                    }
                    result.failed.push(ManualFailure {
                        student_id,
                        error_kind: err.kind(),
                        message: err.client_message(),
                    });
                }
            }
        }

        info!(
            teacher_id = params.teacher_id,
            class_id = params.class_id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Manual attendance batch processed"
        );
        Ok(result)
    }

    pub async fn list_for_class(
        &self,
        teacher_id: i64,
        class_id: i64,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.require_owner(teacher_id, class_id).await?;
        Ok(self.ledger.list_for_class(class_id).await?)
    }

    /// Teacher correction of a record's notes or schedule. Identity fields,
    /// and therefore the dedup key, never change.
    pub async fn update_attendance(
        &self,
        teacher_id: i64,
        record_id: i64,
        correction: AttendanceCorrection,
    ) -> Result<AttendanceRecord, AttendanceError> {
        if correction.notes.is_none() && correction.schedule_id.is_none() {
            return Err(AttendanceError::InvalidInput(
                "nothing to update: provide notes or scheduleId".into(),
            ));
        }

        let record = self
            .ledger
            .find_by_id(record_id)
            .await?
            .ok_or(AttendanceError::NotFound)?;
        if !self.owners.is_owner(teacher_id, record.class_id).await? {
            return Err(AttendanceError::NotFound);
        }

        let updated = self
            .ledger
            .update_correction(
                &record,
                correction.notes,
                correction.schedule_id,
                self.clock.now(),
            )
            .await?;

        info!(
            target: "audit",
            teacher_id,
            record_id,
            student_id = record.student_id,
            class_id = record.class_id,
            old_notes = ?record.notes,
            new_notes = ?updated.notes,
            old_schedule_id = ?record.schedule_id,
            new_schedule_id = ?updated.schedule_id,
            "Attendance record corrected"
        );
        Ok(updated)
    }

    async fn mark_one(
        &self,
        student_id: i64,
        class_id: i64,
        schedule_id: Option<i64>,
        notes: &str,
    ) -> Result<AttendanceRecord, AttendanceError> {
        if !self.enrollment.is_enrolled(student_id, class_id).await? {
            return Err(AttendanceError::NotEnrolled);
        }

        let now = self.clock.now();
        self.record_once(NewRecord {
            student_id,
            class_id,
            session_id: None,
            schedule_id,
            timestamp: now,
            verification_method: VerificationMethod::ManualTeacherEntry,
            latitude: None,
            longitude: None,
            notes: Some(notes.to_string()),
            dedup_key: self.uniqueness.dedup_key(student_id, class_id, None, now),
            day_key: day_key(student_id, class_id, now),
        })
        .await
    }

    /// Inserts unless the dedup key is taken. Manual entries are also refused
    /// when the student already has any record for that class and day. A
    /// transient storage error is retried once; the insert is idempotent so
    /// the retry cannot duplicate.
    async fn record_once(&self, record: NewRecord) -> Result<AttendanceRecord, AttendanceError> {
        let outcome = match self.insert(record.clone()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(student_id = record.student_id, error = %err, "Attendance insert failed, retrying");
                self.insert(record).await?
            }
        };

        match outcome {
            InsertOutcome::Inserted(saved) => Ok(saved),
            InsertOutcome::Duplicate => Err(AttendanceError::AlreadyRecorded),
        }
    }

    async fn insert(&self, record: NewRecord) -> Result<InsertOutcome, sea_orm::DbErr> {
        if record.verification_method.is_manual() {
            self.ledger.insert_if_day_free(record).await
        } else {
            self.ledger.insert_if_absent(record).await
        }
    }

    async fn require_owner(&self, teacher_id: i64, class_id: i64) -> Result<(), AttendanceError> {
        if self.owners.is_owner(teacher_id, class_id).await? {
            Ok(())
        } else {
            Err(AttendanceError::Unauthorized)
        }
    }
}
