//! 反规范化计数的原子写入
//!
//! 所有相对增减都是单条 UPDATE，减法在同一语句内下限截断为 0，
//! 不做先读后写。

use sea_orm::sea_query::{Expr, IntoIden};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter};

use migration::entities::{ProductEntity, StoreEntity, product, store};

use super::catalog;

/// 店铺转化率：order_count / view_count * 100，保留两位，截断到 [0, 999.99]
pub const CONVERSION_RATE_SQL: &str = "CASE \
    WHEN view_count <= 0 OR order_count <= 0 THEN 0 \
    WHEN order_count * 100.0 / view_count >= 999.99 THEN 999.99 \
    ELSE ROUND(order_count * 100.0 / view_count, 2) END";

/// `col + delta`，delta 为负时 `CASE WHEN col > |delta| THEN col - |delta| ELSE 0 END`
pub fn floored_delta<T>(col: T, delta: i64) -> Expr
where
    T: IntoIden + Copy,
{
    if delta >= 0 {
        Expr::col(col).add(delta)
    } else {
        let magnitude = delta.saturating_neg();
        Expr::case(Expr::col(col).gt(magnitude), Expr::col(col).sub(magnitude))
            .finally(0)
            .into()
    }
}

/// 在给定连接（连接池或事务）上执行计数写入
pub struct CounterWriter<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CounterWriter<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// 商品计数相对增减，返回受影响行数
    pub async fn adjust_product(
        &self,
        product_id: i64,
        column: product::Column,
        delta: i64,
    ) -> Result<u64, DbErr> {
        if delta == 0 {
            return Ok(0);
        }
        let res = ProductEntity::update_many()
            .col_expr(column, floored_delta(column, delta))
            .filter(product::Column::Id.eq(product_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    /// 店铺计数相对增减，返回受影响行数
    pub async fn adjust_store(
        &self,
        store_id: i64,
        column: store::Column,
        delta: i64,
    ) -> Result<u64, DbErr> {
        if delta == 0 {
            return Ok(0);
        }
        let res = StoreEntity::update_many()
            .col_expr(column, floored_delta(column, delta))
            .filter(store::Column::Id.eq(store_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    /// 订单进入/离开已完成集合：order_count 与 total_revenue 同一语句更新
    pub async fn adjust_store_orders(
        &self,
        store_id: i64,
        orders_delta: i64,
        revenue_delta: i64,
    ) -> Result<u64, DbErr> {
        let res = StoreEntity::update_many()
            .col_expr(
                store::Column::OrderCount,
                floored_delta(store::Column::OrderCount, orders_delta),
            )
            .col_expr(
                store::Column::TotalRevenue,
                floored_delta(store::Column::TotalRevenue, revenue_delta),
            )
            .filter(store::Column::Id.eq(store_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    /// 用当前 order_count / view_count 重算转化率
    pub async fn refresh_conversion_rate(&self, store_id: i64) -> Result<u64, DbErr> {
        let res = StoreEntity::update_many()
            .col_expr(store::Column::ConversionRate, Expr::cust(CONVERSION_RATE_SQL))
            .filter(store::Column::Id.eq(store_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    /// 从 reviews 全量重算 review_count / average_rating 并覆盖写入
    pub async fn recompute_review_stats(&self, product_id: i64) -> Result<u64, DbErr> {
        let stats = catalog::review_stats(self.conn, product_id).await?;
        let res = ProductEntity::update_many()
            .col_expr(product::Column::ReviewCount, Expr::val(stats.count))
            .col_expr(product::Column::AverageRating, Expr::val(stats.average))
            .filter(product::Column::Id.eq(product_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    fn render(expr: Expr) -> String {
        Query::update()
            .table(StoreEntity)
            .value(store::Column::ViewCount, expr)
            .to_string(SqliteQueryBuilder)
    }

    #[test]
    fn test_positive_delta_is_plain_add() {
        let sql = render(floored_delta(store::Column::ViewCount, 3));
        assert!(sql.contains(r#""view_count" + 3"#), "{sql}");
        assert!(!sql.contains("CASE"));
    }

    #[test]
    fn test_negative_delta_is_floored() {
        let sql = render(floored_delta(store::Column::ViewCount, -1));
        assert!(sql.contains("CASE WHEN"), "{sql}");
        assert!(sql.contains(r#""view_count" > 1"#), "{sql}");
        assert!(sql.contains("ELSE 0"), "{sql}");
    }

    #[test]
    fn test_conversion_rate_sql_bounds() {
        assert!(CONVERSION_RATE_SQL.contains("999.99"));
        assert!(CONVERSION_RATE_SQL.contains("view_count <= 0"));
    }
}
