//! Narrow interfaces to the roster data the attendance core does not own.

use crate::error::AttendanceError;
use async_trait::async_trait;
use db::models::class_member::{Model as ClassMember, Role};
use sea_orm::{DatabaseConnection, DbErr};

#[derive(Debug, thiserror::Error)]
#[error("{source_name} failed: {message}")]
pub struct DirectoryError {
    pub source_name: &'static str,
    pub message: String,
}

impl DirectoryError {
    pub fn new(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            message: message.into(),
        }
    }
}

impl From<DirectoryError> for AttendanceError {
    fn from(err: DirectoryError) -> Self {
        tracing::warn!(source = err.source_name, error = %err.message, "Directory lookup failed");
        AttendanceError::UpstreamUnavailable(err.source_name.to_string())
    }
}

#[async_trait]
pub trait EnrollmentDirectory: Send + Sync {
    async fn is_enrolled(&self, student_id: i64, class_id: i64) -> Result<bool, DirectoryError>;
}

#[async_trait]
pub trait ClassOwnershipDirectory: Send + Sync {
    async fn is_owner(&self, teacher_id: i64, class_id: i64) -> Result<bool, DirectoryError>;
}

/// Both directories, answered from the local `class_members` table.
#[derive(Clone)]
pub struct ClassMemberDirectory {
    db: DatabaseConnection,
}

impl ClassMemberDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn lookup_failed(source_name: &'static str) -> impl FnOnce(DbErr) -> DirectoryError {
    move |err| DirectoryError::new(source_name, err.to_string())
}

#[async_trait]
impl EnrollmentDirectory for ClassMemberDirectory {
    async fn is_enrolled(&self, student_id: i64, class_id: i64) -> Result<bool, DirectoryError> {
        ClassMember::has_role(&self.db, student_id, class_id, Role::Student)
            .await
            .map_err(lookup_failed("enrollment directory"))
    }
}

#[async_trait]
impl ClassOwnershipDirectory for ClassMemberDirectory {
    async fn is_owner(&self, teacher_id: i64, class_id: i64) -> Result<bool, DirectoryError> {
        ClassMember::has_role(&self.db, teacher_id, class_id, Role::Teacher)
            .await
            .map_err(lookup_failed("class ownership directory"))
    }
}
