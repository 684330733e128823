use crate::models::attendance_record::{ActiveModel, Column, Entity, Model, VerificationMethod};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait,
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr,
};

#[derive(Debug, Clone)]
pub struct NewRecord {
    pub student_id: i64,
    pub class_id: i64,
    pub session_id: Option<String>,
    pub schedule_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub verification_method: VerificationMethod,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub dedup_key: String,
    pub day_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Model),
    /// A record with the same dedup key already exists; nothing was written.
    Duplicate,
}

/// Persistent storage for attendance records.
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Single atomic insert-if-absent keyed on `dedup_key`.
    async fn insert_if_absent(&self, record: NewRecord) -> Result<InsertOutcome, DbErr>;

    /// Like [`insert_if_absent`](Self::insert_if_absent), but also reports
    /// `Duplicate` when any record already holds `day_key`. The existence
    /// check and the insert are one statement.
    async fn insert_if_day_free(&self, record: NewRecord) -> Result<InsertOutcome, DbErr>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Model>, DbErr>;

    async fn list_for_class(&self, class_id: i64) -> Result<Vec<Model>, DbErr>;

    async fn count_for_session(&self, session_id: &str) -> Result<u64, DbErr>;

    /// Overwrites the mutable fields of a record.
    async fn update_correction(
        &self,
        record: &Model,
        notes: Option<String>,
        schedule_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<Model, DbErr>;
}

#[derive(Clone)]
pub struct AttendanceRepository {
    db: DatabaseConnection,
}

impl AttendanceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl AttendanceLedger for AttendanceRepository {
    async fn insert_if_absent(&self, record: NewRecord) -> Result<InsertOutcome, DbErr> {
        let row = ActiveModel {
            id: NotSet,
            student_id: Set(record.student_id),
            class_id: Set(record.class_id),
            session_id: Set(record.session_id),
            schedule_id: Set(record.schedule_id),
            timestamp: Set(record.timestamp),
            verification_method: Set(record.verification_method),
            manual_entry: Set(record.verification_method.is_manual()),
            latitude: Set(record.latitude),
            longitude: Set(record.longitude),
            notes: Set(record.notes),
            dedup_key: Set(record.dedup_key),
            day_key: Set(record.day_key),
            updated_at: Set(record.timestamp),
        };

        match row.insert(&self.db).await {
            Ok(model) => Ok(InsertOutcome::Inserted(model)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err),
        }
    }

    async fn insert_if_day_free(&self, record: NewRecord) -> Result<InsertOutcome, DbErr> {
        let taken = Query::select()
            .expr(Expr::val(1))
            .from(Entity)
            .and_where(Column::DayKey.eq(record.day_key.clone()))
            .to_owned();

        let values: Vec<SimpleExpr> = vec![
            Expr::val(record.student_id).into(),
            Expr::val(record.class_id).into(),
            Expr::val(record.session_id.clone()).into(),
            Expr::val(record.schedule_id).into(),
            Expr::val(record.timestamp).into(),
            Expr::val(record.verification_method.to_value()).into(),
            Expr::val(record.verification_method.is_manual()).into(),
            Expr::val(record.latitude).into(),
            Expr::val(record.longitude).into(),
            Expr::val(record.notes.clone()).into(),
            Expr::val(record.dedup_key.clone()).into(),
            Expr::val(record.day_key.clone()).into(),
            Expr::val(record.timestamp).into(),
        ];
        let select = Query::select()
            .exprs(values)
            .and_where(Expr::exists(taken).not())
            .to_owned();

        let insert = Query::insert()
            .into_table(Entity)
            .columns([
                Column::StudentId,
                Column::ClassId,
                Column::SessionId,
                Column::ScheduleId,
                Column::Timestamp,
                Column::VerificationMethod,
                Column::ManualEntry,
                Column::Latitude,
                Column::Longitude,
                Column::Notes,
                Column::DedupKey,
                Column::DayKey,
                Column::UpdatedAt,
            ])
            .select_from(select)
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .to_owned();

        let backend = self.db.get_database_backend();
        let res = match self.db.execute(backend.build(&insert)).await {
            Ok(res) => res,
            Err(err) if is_unique_violation(&err) => return Ok(InsertOutcome::Duplicate),
            Err(err) => return Err(err),
        };
        if res.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }

        Entity::find()
            .filter(Column::DedupKey.eq(record.dedup_key))
            .one(&self.db)
            .await?
            .map(InsertOutcome::Inserted)
            .ok_or_else(|| DbErr::RecordNotFound("attendance record after insert".into()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(&self.db).await
    }

    async fn list_for_class(&self, class_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::ClassId.eq(class_id))
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
    }

    async fn count_for_session(&self, session_id: &str) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .count(&self.db)
            .await
    }

    async fn update_correction(
        &self,
        record: &Model,
        notes: Option<String>,
        schedule_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = record.clone().into();
        if notes.is_some() {
            active.notes = Set(notes);
        }
        if schedule_id.is_some() {
            active.schedule_id = Set(schedule_id);
        }
        active.updated_at = Set(at);
        active.update(&self.db).await
    }
}
