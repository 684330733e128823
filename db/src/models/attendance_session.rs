use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One teacher-initiated, time-boxed QR attendance window for a class.
///
/// `id` is internal; `session_id` is the opaque identifier handed to clients.
/// `version` is bumped on every mutation and is what rotations compare-and-swap on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i64,
    #[sea_orm(unique)]
    pub session_id: String,
    pub class_id: i64,
    pub owner_teacher_id: i64,
    pub schedule_id: Option<i64>,
    #[sea_orm(unique)]
    pub current_token: String,
    pub token_issued_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub previous_token: Option<String>,
    #[serde(skip_serializing)]
    pub previous_token_issued_at: Option<DateTime<Utc>>,
    pub session_expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "attendance_session_status"
)]
pub enum SessionStatus {
    #[sea_orm(string_value = "active")]
    Active,

    /// Absorbing: a terminated session never becomes active again.
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.session_expires_at
    }

    /// Active and inside its lifetime.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && !self.is_expired_at(now)
    }

    /// Age of the current token. Negative ages (clock behind the store) count as fresh.
    pub fn token_age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.token_issued_at).max(Duration::zero())
    }
}
