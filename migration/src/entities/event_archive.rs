//! 已归档事件实体，id 与原事件一致

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "events_archive")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub event_type: String,
    pub product_id: Option<i64>,
    pub store_id: Option<i64>,
    pub user_id: Option<i64>,
    pub invoked_on: String,
    pub value: Option<i64>,
    pub created_at: DateTimeUtc,
    pub archived_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
