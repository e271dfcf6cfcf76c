//! 统计对账（Statistics Reconciler）
//!
//! 从业务表和事件日志（live + archive）重新计算所有计数并覆盖写入，
//! 修复增量维护累积的漂移。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use migration::entities::{ProductEntity, StoreEntity, product, store};

use super::health::HealthReport;
use super::metrics::store_conversion_rate;
use crate::errors::{Result, StatsError};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::catalog;
use crate::storage::backend::events::{EventScope, lifetime_event_counts};
use crate::storage::backend::retry;

/// 商品计数的真实值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub product_id: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub total_sales: i64,
    pub review_count: i64,
    pub average_rating: Option<f64>,
}

/// 店铺计数的真实值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub store_id: i64,
    pub view_count: i64,
    pub follower_count: i64,
    pub product_count: i64,
    pub order_count: i64,
    pub total_sales: i64,
    pub total_revenue: i64,
    pub conversion_rate: f64,
}

/// 店铺对账结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReconciliation {
    pub stats: StoreStats,
    /// 缓存值有偏差并被改写
    pub updated: bool,
}

/// 批量对账汇总
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

pub struct StatsReconciler {
    storage: Arc<SeaOrmStorage>,
}

impl StatsReconciler {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 重算单个商品的计数（无条件覆盖）
    pub async fn recalculate_product_stats(&self, product_id: i64) -> Result<ProductStats> {
        let db = self.storage.get_db();

        if ProductEntity::find_by_id(product_id).one(db).await?.is_none() {
            return Err(StatsError::not_found(format!(
                "Product {} does not exist",
                product_id
            )));
        }

        let reviews = catalog::review_stats(db, product_id).await?;
        let events = lifetime_event_counts(db, EventScope::Product(product_id)).await?;

        let stats = ProductStats {
            product_id,
            view_count: events.views,
            like_count: events.net_likes(),
            total_sales: events.purchases,
            review_count: reviews.count,
            average_rating: reviews.average,
        };

        let s = &stats;
        retry::with_retry(
            "recalculate_product_stats",
            self.storage.retry_config(),
            || async move {
                ProductEntity::update_many()
                    .col_expr(product::Column::ViewCount, Expr::val(s.view_count))
                    .col_expr(product::Column::LikeCount, Expr::val(s.like_count))
                    .col_expr(product::Column::TotalSales, Expr::val(s.total_sales))
                    .col_expr(product::Column::ReviewCount, Expr::val(s.review_count))
                    .col_expr(product::Column::AverageRating, Expr::val(s.average_rating))
                    .filter(product::Column::Id.eq(s.product_id))
                    .exec(db)
                    .await
            },
        )
        .await?;

        debug!("Product {} stats recalculated: {:?}", product_id, stats);
        Ok(stats)
    }

    /// 重算单个店铺的计数
    ///
    /// 使用带条件的 UPDATE：只有任一缓存值与新值不同时才写入。
    pub async fn recalculate_store_stats(&self, store_id: i64) -> Result<StoreReconciliation> {
        let db = self.storage.get_db();

        if StoreEntity::find_by_id(store_id).one(db).await?.is_none() {
            return Err(StatsError::not_found(format!(
                "Store {} does not exist",
                store_id
            )));
        }

        let events = lifetime_event_counts(db, EventScope::Store(store_id)).await?;
        let (order_count, total_revenue) = catalog::completed_order_totals(db, store_id).await?;
        let product_count = catalog::live_product_count(db, store_id).await?;
        let follower_count = catalog::store_like_count(db, store_id).await?;

        let stats = StoreStats {
            store_id,
            view_count: events.views,
            follower_count,
            product_count,
            order_count,
            total_sales: events.purchases,
            total_revenue,
            conversion_rate: store_conversion_rate(order_count, events.views),
        };

        let s = &stats;
        let result = retry::with_retry(
            "recalculate_store_stats",
            self.storage.retry_config(),
            || async move {
                StoreEntity::update_many()
                    .col_expr(store::Column::ViewCount, Expr::val(s.view_count))
                    .col_expr(store::Column::FollowerCount, Expr::val(s.follower_count))
                    .col_expr(store::Column::ProductCount, Expr::val(s.product_count))
                    .col_expr(store::Column::OrderCount, Expr::val(s.order_count))
                    .col_expr(store::Column::TotalSales, Expr::val(s.total_sales))
                    .col_expr(store::Column::TotalRevenue, Expr::val(s.total_revenue))
                    .col_expr(store::Column::ConversionRate, Expr::val(s.conversion_rate))
                    .filter(store::Column::Id.eq(s.store_id))
                    .filter(
                        Condition::any()
                            .add(store::Column::ViewCount.ne(s.view_count))
                            .add(store::Column::FollowerCount.ne(s.follower_count))
                            .add(store::Column::ProductCount.ne(s.product_count))
                            .add(store::Column::OrderCount.ne(s.order_count))
                            .add(store::Column::TotalSales.ne(s.total_sales))
                            .add(store::Column::TotalRevenue.ne(s.total_revenue))
                            .add(store::Column::ConversionRate.ne(s.conversion_rate)),
                    )
                    .exec(db)
                    .await
            },
        )
        .await?;

        let updated = result.rows_affected > 0;
        if updated {
            info!("Store {} stats drifted and were rewritten", store_id);
        } else {
            debug!("Store {} stats already consistent", store_id);
        }
        Ok(StoreReconciliation { stats, updated })
    }

    /// 重算所有店铺，单个失败不影响其它店铺
    pub async fn recalculate_all_store_stats(&self) -> Result<ReconcileSummary> {
        let ids: Vec<i64> = StoreEntity::find()
            .select_only()
            .column(store::Column::Id)
            .order_by_asc(store::Column::Id)
            .into_tuple()
            .all(self.storage.get_db())
            .await?;

        info!("Reconciling {} stores", ids.len());
        let mut summary = ReconcileSummary::default();
        for id in ids {
            summary.processed += 1;
            match self.recalculate_store_stats(id).await {
                Ok(r) if r.updated => summary.updated += 1,
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to reconcile store {}: {}", id, e);
                    summary.failed += 1;
                    summary.errors.push(format!("store {}: {}", id, e));
                }
            }
        }

        info!(
            "Store reconciliation finished: processed {}, updated {}, failed {}",
            summary.processed, summary.updated, summary.failed
        );
        Ok(summary)
    }

    /// 重算所有商品（含软删除商品），单个失败不影响其它商品
    pub async fn recalculate_all_product_stats(&self) -> Result<ReconcileSummary> {
        let ids: Vec<i64> = ProductEntity::find()
            .select_only()
            .column(product::Column::Id)
            .order_by_asc(product::Column::Id)
            .into_tuple()
            .all(self.storage.get_db())
            .await?;

        info!("Reconciling {} products", ids.len());
        let mut summary = ReconcileSummary::default();
        for id in ids {
            summary.processed += 1;
            match self.recalculate_product_stats(id).await {
                Ok(_) => summary.updated += 1,
                Err(e) => {
                    error!("Failed to reconcile product {}: {}", id, e);
                    summary.failed += 1;
                    summary.errors.push(format!("product {}: {}", id, e));
                }
            }
        }

        info!(
            "Product reconciliation finished: processed {}, failed {}",
            summary.processed, summary.failed
        );
        Ok(summary)
    }

    /// 店铺数据健康检查（只读）
    pub async fn check_data_health(&self, store_id: i64) -> Result<HealthReport> {
        let store = StoreEntity::find_by_id(store_id)
            .one(self.storage.get_db())
            .await?
            .ok_or_else(|| StatsError::not_found(format!("Store {} does not exist", store_id)))?;

        let actual = self.storage.store_catalog_health(store_id).await?;
        let report = HealthReport::evaluate(&store, &actual);

        if report.recommendations.is_empty() {
            debug!("Store {} health: {}", store_id, report.health_status);
        } else {
            warn!(
                "Store {} health: {} ({} issues)",
                store_id,
                report.health_status,
                report.recommendations.len()
            );
        }
        Ok(report)
    }

    /// 启动后台对账任务
    pub fn spawn_background_task(self: Arc<Self>, interval_minutes: u64) {
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_minutes.max(1) * 60);

            // 首次运行延迟 1 分钟
            tokio::time::sleep(StdDuration::from_secs(60)).await;

            loop {
                if let Err(e) = self.recalculate_all_product_stats().await {
                    error!("Product reconciliation task failed: {}", e);
                }
                if let Err(e) = self.recalculate_all_store_stats().await {
                    error!("Store reconciliation task failed: {}", e);
                }

                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Stats reconciliation background task started (interval: {} minutes)",
            interval_minutes
        );
    }
}
