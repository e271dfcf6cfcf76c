//! 店铺实体（携带反规范化计数）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub view_count: i64,
    pub follower_count: i64,
    pub product_count: i64,
    pub order_count: i64,
    pub total_sales: i64,
    pub total_revenue: i64,
    #[sea_orm(column_type = "Double")]
    pub conversion_rate: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
