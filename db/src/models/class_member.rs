use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who teaches and who is enrolled in a class.
///
/// This is the default backing store for the ownership and enrollment
/// directories; deployments that keep rosters elsewhere never touch it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "class_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub class_id: i64,

    pub role: Role,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "class_member_role")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "teacher")]
    Teacher,

    #[sea_orm(string_value = "student")]
    Student,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Adds (or re-roles) a user in a class.
    pub async fn assign<C>(db: &C, user_id: i64, class_id: i64, role: Role) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = ActiveModel {
            user_id: Set(user_id),
            class_id: Set(class_id),
            role: Set(role),
        };
        Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::UserId, Column::ClassId])
                    .update_column(Column::Role)
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    pub async fn has_role<C>(db: &C, user_id: i64, class_id: i64, role: Role) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let count = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Role.eq(role))
            .count(db)
            .await?;
        Ok(count > 0)
    }
}
