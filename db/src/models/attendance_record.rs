use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One credited attendance. Written once by the recorder; afterwards only
/// `notes` and `schedule_id` may change, through a teacher correction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    /// `None` for manually entered records.
    pub session_id: Option<String>,
    pub schedule_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub verification_method: VerificationMethod,
    /// Mirrors `verification_method` for older clients that filter on it.
    pub manual_entry: bool,
    #[sea_orm(column_type = "Double", nullable)]
    pub latitude: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub longitude: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub dedup_key: String,
    /// `{class}:{utc day}:{student}` on every row; manual inserts refuse to
    /// land on a day key that is already taken.
    #[serde(skip_serializing)]
    pub day_key: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "verification_method")]
pub enum VerificationMethod {
    #[sea_orm(string_value = "qr_face")]
    QrFace,

    #[sea_orm(string_value = "manual_teacher_entry")]
    ManualTeacherEntry,
}

impl VerificationMethod {
    pub fn is_manual(self) -> bool {
        self == VerificationMethod::ManualTeacherEntry
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
