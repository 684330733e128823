use crate::models::attendance_session::{ActiveModel, Column, Entity, Model, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder,
};

/// Everything needed to persist a freshly created session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub class_id: i64,
    pub owner_teacher_id: i64,
    pub schedule_id: Option<i64>,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Keyed storage for attendance sessions.
///
/// `rotate` and `terminate` are conditional writes: they only apply when the
/// row still matches what the caller read, and report whether they did.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: NewSession) -> Result<Model, DbErr>;

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Model>, DbErr>;

    /// Active session whose *current* token is `token`.
    async fn find_active_by_token(&self, token: &str) -> Result<Option<Model>, DbErr>;

    /// Active session whose token *before the latest rotation* was `token`.
    async fn find_active_by_previous_token(&self, token: &str) -> Result<Option<Model>, DbErr>;

    /// Active sessions of one teacher, newest first, optionally for one class.
    async fn find_active_by_owner(
        &self,
        owner_teacher_id: i64,
        class_id: Option<i64>,
    ) -> Result<Vec<Model>, DbErr>;

    /// Replaces the token of `current` if nobody else changed the row since it
    /// was read. Returns the new state, or `None` when the write lost a race.
    async fn rotate(
        &self,
        current: &Model,
        token: String,
        issued_at: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr>;

    /// Moves an active session to `Terminated`. Returns `false` if it was not
    /// active any more.
    async fn terminate(&self, session: &Model, at: DateTime<Utc>) -> Result<bool, DbErr>;

    /// Marks every active session whose lifetime is over at `now` as
    /// terminated. Returns how many rows changed.
    async fn terminate_expired(&self, now: DateTime<Utc>) -> Result<u64, DbErr>;

    /// Deletes terminated sessions whose lifetime ended before `cutoff`.
    async fn delete_terminated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr>;
}

#[derive(Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert(&self, session: NewSession) -> Result<Model, DbErr> {
        ActiveModel {
            id: NotSet,
            session_id: Set(session.session_id),
            class_id: Set(session.class_id),
            owner_teacher_id: Set(session.owner_teacher_id),
            schedule_id: Set(session.schedule_id),
            current_token: Set(session.token),
            token_issued_at: Set(session.issued_at),
            previous_token: Set(None),
            previous_token_issued_at: Set(None),
            session_expires_at: Set(session.expires_at),
            status: Set(SessionStatus::Active),
            version: Set(0),
            created_at: Set(session.issued_at),
        }
        .insert(&self.db)
        .await
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
    }

    async fn find_active_by_token(&self, token: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::CurrentToken.eq(token))
            .filter(Column::Status.eq(SessionStatus::Active))
            .one(&self.db)
            .await
    }

    async fn find_active_by_previous_token(&self, token: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::PreviousToken.eq(token))
            .filter(Column::Status.eq(SessionStatus::Active))
            .one(&self.db)
            .await
    }

    async fn find_active_by_owner(
        &self,
        owner_teacher_id: i64,
        class_id: Option<i64>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find()
            .filter(Column::OwnerTeacherId.eq(owner_teacher_id))
            .filter(Column::Status.eq(SessionStatus::Active));
        if let Some(class_id) = class_id {
            query = query.filter(Column::ClassId.eq(class_id));
        }
        query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
    }

    async fn rotate(
        &self,
        current: &Model,
        token: String,
        issued_at: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr> {
        let next_version = current.version + 1;
        let res = Entity::update_many()
            .col_expr(Column::PreviousToken, Expr::value(current.current_token.clone()))
            .col_expr(Column::PreviousTokenIssuedAt, Expr::value(current.token_issued_at))
            .col_expr(Column::CurrentToken, Expr::value(token.clone()))
            .col_expr(Column::TokenIssuedAt, Expr::value(issued_at))
            .col_expr(Column::Version, Expr::value(next_version))
            .filter(Column::Id.eq(current.id))
            .filter(Column::Version.eq(current.version))
            .filter(Column::Status.eq(SessionStatus::Active))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Ok(None);
        }

        Ok(Some(Model {
            previous_token: Some(current.current_token.clone()),
            previous_token_issued_at: Some(current.token_issued_at),
            current_token: token,
            token_issued_at: issued_at,
            version: next_version,
            ..current.clone()
        }))
    }

    async fn terminate(&self, session: &Model, at: DateTime<Utc>) -> Result<bool, DbErr> {
        // Never move the lifetime forward, and never below the last issue time.
        let expires_at = at
            .max(session.token_issued_at)
            .min(session.session_expires_at);

        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(SessionStatus::Terminated))
            .col_expr(Column::SessionExpiresAt, Expr::value(expires_at))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1))
            .filter(Column::Id.eq(session.id))
            .filter(Column::Status.eq(SessionStatus::Active))
            .exec(&self.db)
            .await?;

        Ok(res.rows_affected > 0)
    }

    async fn terminate_expired(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(SessionStatus::Terminated))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1))
            .filter(Column::Status.eq(SessionStatus::Active))
            .filter(Column::SessionExpiresAt.lte(now))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn delete_terminated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::Status.eq(SessionStatus::Terminated))
            .filter(Column::SessionExpiresAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}
