//! 统计的数据源查询（reviews / orders / likes / products 等业务表）
//!
//! 供计数写入、对账器和健康检查读取"真实值"。

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};

use migration::entities::{
    CategoryEntity, LikeEntity, OrderEntity, ProductCategoryEntity, ProductEntity,
    ProductVariantEntity, ReviewEntity, category, like, order, product, product_category,
    product_variant, review,
};

use super::sql;
use crate::stats::metrics::round2;
use crate::storage::models::OrderStatus;

/// 评论统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewStats {
    pub count: i64,
    /// 无评论时为 None
    pub average: Option<f64>,
}

/// 店铺健康检查所需的真实值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCatalogHealth {
    pub actual_product_count: i64,
    pub actual_order_count: i64,
    pub actual_revenue: i64,
    pub products_without_variants: i64,
    pub products_without_categories: i64,
    pub empty_categories: i64,
}

pub async fn review_stats<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<ReviewStats, DbErr> {
    let backend = conn.get_database_backend();
    let row: Option<(i64, i64)> = ReviewEntity::find()
        .select_only()
        .column_as(Expr::cust("COUNT(*)"), "review_count")
        .column_as(
            Expr::cust(sql::sum_column("rating", backend)),
            "rating_sum",
        )
        .filter(review::Column::ProductId.eq(product_id))
        .into_tuple()
        .one(conn)
        .await?;

    let (count, sum) = row.unwrap_or((0, 0));
    let average = (count > 0).then(|| round2(sum as f64 / count as f64));
    Ok(ReviewStats { count, average })
}

/// 已完成订单（SHIPPED / DELIVERED）的数量与金额合计
pub async fn completed_order_totals<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
) -> Result<(i64, i64), DbErr> {
    let backend = conn.get_database_backend();
    let row: Option<(i64, i64)> = OrderEntity::find()
        .select_only()
        .column_as(Expr::cust("COUNT(*)"), "order_count")
        .column_as(Expr::cust(sql::sum_column("total", backend)), "revenue")
        .filter(order::Column::StoreId.eq(store_id))
        .filter(order::Column::Status.is_in(OrderStatus::completed_values()))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(row.unwrap_or((0, 0)))
}

/// 未软删除的商品数
pub async fn live_product_count<C: ConnectionTrait>(conn: &C, store_id: i64) -> Result<i64, DbErr> {
    let n = ProductEntity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .filter(product::Column::DeletedAt.is_null())
        .count(conn)
        .await?;
    Ok(n as i64)
}

/// 店铺被点赞（关注）次数
pub async fn store_like_count<C: ConnectionTrait>(conn: &C, store_id: i64) -> Result<i64, DbErr> {
    let n = LikeEntity::find()
        .filter(like::Column::StoreId.eq(store_id))
        .count(conn)
        .await?;
    Ok(n as i64)
}

/// 没有任何规格的在售商品数
pub async fn products_without_variants<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
) -> Result<i64, DbErr> {
    let n = ProductEntity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .filter(product::Column::DeletedAt.is_null())
        .filter(
            product::Column::Id.not_in_subquery(
                Query::select()
                    .column(product_variant::Column::ProductId)
                    .from(ProductVariantEntity)
                    .to_owned(),
            ),
        )
        .count(conn)
        .await?;
    Ok(n as i64)
}

/// 未归入任何分类的在售商品数
pub async fn products_without_categories<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
) -> Result<i64, DbErr> {
    let n = ProductEntity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .filter(product::Column::DeletedAt.is_null())
        .filter(
            product::Column::Id.not_in_subquery(
                Query::select()
                    .column(product_category::Column::ProductId)
                    .from(ProductCategoryEntity)
                    .to_owned(),
            ),
        )
        .count(conn)
        .await?;
    Ok(n as i64)
}

/// 没有任何商品的分类数
pub async fn empty_categories<C: ConnectionTrait>(conn: &C, store_id: i64) -> Result<i64, DbErr> {
    let n = CategoryEntity::find()
        .filter(category::Column::StoreId.eq(store_id))
        .filter(
            category::Column::Id.not_in_subquery(
                Query::select()
                    .column(product_category::Column::CategoryId)
                    .from(ProductCategoryEntity)
                    .to_owned(),
            ),
        )
        .count(conn)
        .await?;
    Ok(n as i64)
}

impl super::SeaOrmStorage {
    /// 健康检查：一次性读取所有真实值
    pub async fn store_catalog_health(&self, store_id: i64) -> anyhow::Result<StoreCatalogHealth> {
        let db = &self.db;
        let (actual_order_count, actual_revenue) = completed_order_totals(db, store_id).await?;
        Ok(StoreCatalogHealth {
            actual_product_count: live_product_count(db, store_id).await?,
            actual_order_count,
            actual_revenue,
            products_without_variants: products_without_variants(db, store_id).await?,
            products_without_categories: products_without_categories(db, store_id).await?,
            empty_categories: empty_categories(db, store_id).await?,
        })
    }
}
