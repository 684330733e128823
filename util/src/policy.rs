use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// `{class}:{utc day}:{student}`: the class meeting a record belongs to.
///
/// Every record carries it. A manual entry is only written when no record,
/// QR or manual, holds the same day key, whatever the policy.
pub fn day_key(student_id: i64, class_id: i64, at: DateTime<Utc>) -> String {
    format!("{class_id}:{}:{student_id}", at.date_naive().format("%Y-%m-%d"))
}

/// Which attendance records count as duplicates of each other.
///
/// The ledger stores the key produced by [`UniquenessPolicy::dedup_key`] in a
/// UNIQUE column, so the database rejects the second insert no matter how
/// many requests race.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UniquenessPolicy {
    /// One record per student per QR session. Manual entries, which have no
    /// session, are limited to one per student per class per UTC day and are
    /// refused when the student already scanned in that day.
    #[default]
    PerSession,
    /// One record per student per class per UTC day, whatever the session.
    PerDay,
}

impl UniquenessPolicy {
    pub fn dedup_key(
        &self,
        student_id: i64,
        class_id: i64,
        session_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> String {
        let day = day_key(student_id, class_id, at);
        match (self, session_id) {
            (UniquenessPolicy::PerSession, Some(session)) => {
                format!("session:{session}:{student_id}")
            }
            (UniquenessPolicy::PerSession, None) => format!("manual:{day}"),
            (UniquenessPolicy::PerDay, _) => format!("day:{day}"),
        }
    }
}
