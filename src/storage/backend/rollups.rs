//! 天级汇总表的写入与区间合计

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QuerySelect,
};

use migration::entities::{
    ProductStatsDailyEntity, StoreStatsDailyEntity, product_stats_daily, store_stats_daily,
};

use super::events::GroupedEventCounts;
use super::sql::sum_column;

/// 区间合计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromQueryResult)]
pub struct RollupTotals {
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub checkouts: i64,
    pub revenue: i64,
}

/// 覆盖写入某天的商品汇总，返回写入行数
pub async fn upsert_product_daily<C: ConnectionTrait>(
    conn: &C,
    day: NaiveDate,
    rows: &[GroupedEventCounts],
) -> Result<usize, DbErr> {
    if rows.is_empty() {
        return Ok(0);
    }
    let models = rows.iter().map(|r| product_stats_daily::ActiveModel {
        day: Set(day),
        product_id: Set(r.entity_id),
        store_id: Set(r.store_id),
        views: Set(r.views),
        purchases: Set(r.purchases),
        add_to_carts: Set(r.add_to_carts),
        checkouts: Set(r.checkouts),
        revenue: Set(r.revenue),
        ..Default::default()
    });

    ProductStatsDailyEntity::insert_many(models)
        .on_conflict(
            OnConflict::columns([
                product_stats_daily::Column::Day,
                product_stats_daily::Column::ProductId,
            ])
            .update_columns([
                product_stats_daily::Column::StoreId,
                product_stats_daily::Column::Views,
                product_stats_daily::Column::Purchases,
                product_stats_daily::Column::AddToCarts,
                product_stats_daily::Column::Checkouts,
                product_stats_daily::Column::Revenue,
            ])
            .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(rows.len())
}

/// 覆盖写入某天的店铺汇总，返回写入行数
pub async fn upsert_store_daily<C: ConnectionTrait>(
    conn: &C,
    day: NaiveDate,
    rows: &[GroupedEventCounts],
) -> Result<usize, DbErr> {
    if rows.is_empty() {
        return Ok(0);
    }
    let models = rows.iter().map(|r| store_stats_daily::ActiveModel {
        day: Set(day),
        store_id: Set(r.entity_id),
        views: Set(r.views),
        purchases: Set(r.purchases),
        add_to_carts: Set(r.add_to_carts),
        checkouts: Set(r.checkouts),
        revenue: Set(r.revenue),
        ..Default::default()
    });

    StoreStatsDailyEntity::insert_many(models)
        .on_conflict(
            OnConflict::columns([
                store_stats_daily::Column::Day,
                store_stats_daily::Column::StoreId,
            ])
            .update_columns([
                store_stats_daily::Column::Views,
                store_stats_daily::Column::Purchases,
                store_stats_daily::Column::AddToCarts,
                store_stats_daily::Column::Checkouts,
                store_stats_daily::Column::Revenue,
            ])
            .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(rows.len())
}

/// 商品在 [from_day, to_day] 的汇总合计
pub async fn product_rollup_totals<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    from_day: NaiveDate,
    to_day: NaiveDate,
) -> Result<RollupTotals, DbErr> {
    let backend = conn.get_database_backend();
    let row = ProductStatsDailyEntity::find()
        .select_only()
        .column_as(Expr::cust(sum_column("views", backend)), "views")
        .column_as(Expr::cust(sum_column("purchases", backend)), "purchases")
        .column_as(Expr::cust(sum_column("add_to_carts", backend)), "add_to_carts")
        .column_as(Expr::cust(sum_column("checkouts", backend)), "checkouts")
        .column_as(Expr::cust(sum_column("revenue", backend)), "revenue")
        .filter(product_stats_daily::Column::ProductId.eq(product_id))
        .filter(product_stats_daily::Column::Day.between(from_day, to_day))
        .into_model::<RollupTotals>()
        .one(conn)
        .await?;
    Ok(row.unwrap_or_default())
}

/// 店铺在 [from_day, to_day] 的汇总合计
pub async fn store_rollup_totals<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
    from_day: NaiveDate,
    to_day: NaiveDate,
) -> Result<RollupTotals, DbErr> {
    let backend = conn.get_database_backend();
    let row = StoreStatsDailyEntity::find()
        .select_only()
        .column_as(Expr::cust(sum_column("views", backend)), "views")
        .column_as(Expr::cust(sum_column("purchases", backend)), "purchases")
        .column_as(Expr::cust(sum_column("add_to_carts", backend)), "add_to_carts")
        .column_as(Expr::cust(sum_column("checkouts", backend)), "checkouts")
        .column_as(Expr::cust(sum_column("revenue", backend)), "revenue")
        .filter(store_stats_daily::Column::StoreId.eq(store_id))
        .filter(store_stats_daily::Column::Day.between(from_day, to_day))
        .into_model::<RollupTotals>()
        .one(conn)
        .await?;
    Ok(row.unwrap_or_default())
}
