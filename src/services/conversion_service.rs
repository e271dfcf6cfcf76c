//! Conversion analytics service
//!
//! 转化漏斗查询按数据层级选择来源：
//!
//! - 不带时间范围：hybridCached，计数缓存 + 实时事件扫描
//! - 带时间范围且按整天对齐：aggregatedStats，读取天级汇总表
//! - 范围边界不在整天上：rawEvents
//! - 汇总表在该范围内没有浏览量：回退到 rawEvents，直接扫描事件表
//!
//! 排行与表现不佳分析直接基于事件表或计数缓存，不分层。

use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use strum::AsRefStr;
use tracing::{debug, info};

use migration::entities::{ProductEntity, StoreEntity, product, store};

use super::date_range::DateRange;
use super::underperforming::{self, CohortEntry, CohortKind, UnderperformanceReport};
use crate::config::StatsConfig;
use crate::errors::{Result, StatsError};
use crate::stats::metrics::safe_rate;
use crate::storage::SeaOrmStorage;
use crate::storage::backend::events::{self, EventScope, EventTable};
use crate::storage::backend::rollups;
use crate::storage::backend::sql::safe_ratio;

/// 结果的数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ConversionSource {
    HybridCached,
    AggregatedStats,
    RawEvents,
}

/// 转化漏斗结果
///
/// 比率均为 0..1 的原始小数，分母为 0 时为 0。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub entity_id: i64,
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub revenue: i64,
    pub conversion_rate: f64,
    pub add_to_cart_rate: f64,
    /// 仅店铺结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkouts: Option<i64>,
    /// 仅店铺结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_rate: Option<f64>,
    pub source: ConversionSource,
}

struct Funnel {
    views: i64,
    purchases: i64,
    add_to_carts: i64,
    checkouts: i64,
    revenue: i64,
}

impl ConversionResult {
    fn product(entity_id: i64, f: Funnel, source: ConversionSource) -> Self {
        Self {
            entity_id,
            views: f.views,
            purchases: f.purchases,
            add_to_carts: f.add_to_carts,
            revenue: f.revenue,
            conversion_rate: safe_rate(f.purchases, f.views),
            add_to_cart_rate: safe_rate(f.add_to_carts, f.views),
            checkouts: None,
            checkout_rate: None,
            source,
        }
    }

    fn store(entity_id: i64, f: Funnel, source: ConversionSource) -> Self {
        Self {
            checkouts: Some(f.checkouts),
            checkout_rate: Some(safe_rate(f.checkouts, f.add_to_carts)),
            ..Self::product(entity_id, f, source)
        }
    }
}

/// 实时排行中的商品
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: i64,
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub revenue: i64,
    pub conversion_rate: f64,
}

/// 基于计数缓存的排行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTopProduct {
    pub product_id: i64,
    pub store_id: i64,
    pub name: String,
    pub view_count: i64,
    pub total_sales: i64,
    pub conversion_rate: f64,
}

// ============ ConversionAnalyticsService ============

pub struct ConversionAnalyticsService {
    storage: Arc<SeaOrmStorage>,
    settings: StatsConfig,
}

impl ConversionAnalyticsService {
    /// 使用全局配置中的阈值
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let settings = crate::config::get_config().stats.clone();
        Self::with_settings(storage, settings)
    }

    pub fn with_settings(storage: Arc<SeaOrmStorage>, settings: StatsConfig) -> Self {
        Self { storage, settings }
    }

    fn limit_or_default(&self, limit: Option<u64>) -> u64 {
        limit.filter(|l| *l > 0).unwrap_or(self.settings.default_limit)
    }

    /// 商品转化漏斗
    pub async fn compute_product_conversion(
        &self,
        product_id: i64,
        range: Option<&DateRange>,
    ) -> Result<ConversionResult> {
        info!(
            "ConversionAnalytics: product {} conversion (range: {:?})",
            product_id, range
        );
        let db = self.storage.get_db();

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| StatsError::not_found(format!("Product {} does not exist", product_id)))?;

        let result = match range {
            None => {
                let live =
                    events::event_counts(db, EventTable::Live, EventScope::Product(product_id), None)
                        .await?;
                // 缓存里没有收入，hybrid 层的 revenue 不具权威性
                let funnel = Funnel {
                    views: product.view_count,
                    purchases: product.total_sales,
                    add_to_carts: live.add_to_carts,
                    checkouts: live.checkouts,
                    revenue: 0,
                };
                ConversionResult::product(product_id, funnel, ConversionSource::HybridCached)
            }
            Some(range) => {
                // 天级汇总只能回答整天对齐的范围
                let totals = match range.whole_days() {
                    Some((from_day, to_day)) => {
                        rollups::product_rollup_totals(db, product_id, from_day, to_day).await?
                    }
                    None => Default::default(),
                };
                if totals.views > 0 {
                    let funnel = Funnel {
                        views: totals.views,
                        purchases: totals.purchases,
                        add_to_carts: totals.add_to_carts,
                        checkouts: totals.checkouts,
                        revenue: totals.revenue,
                    };
                    ConversionResult::product(product_id, funnel, ConversionSource::AggregatedStats)
                } else {
                    let raw = events::event_counts(
                        db,
                        EventTable::Live,
                        EventScope::Product(product_id),
                        Some(range.as_window()),
                    )
                    .await?;
                    let funnel = Funnel {
                        views: raw.views,
                        purchases: raw.purchases,
                        add_to_carts: raw.add_to_carts,
                        checkouts: raw.checkouts,
                        revenue: raw.revenue,
                    };
                    ConversionResult::product(product_id, funnel, ConversionSource::RawEvents)
                }
            }
        };

        debug!(
            "ConversionAnalytics: product {} -> {} views, {} purchases ({:?})",
            product_id, result.views, result.purchases, result.source
        );
        Ok(result)
    }

    /// 店铺转化漏斗
    pub async fn compute_store_conversion(
        &self,
        store_id: i64,
        range: Option<&DateRange>,
    ) -> Result<ConversionResult> {
        info!(
            "ConversionAnalytics: store {} conversion (range: {:?})",
            store_id, range
        );
        let db = self.storage.get_db();

        let store = StoreEntity::find_by_id(store_id)
            .one(db)
            .await?
            .ok_or_else(|| StatsError::not_found(format!("Store {} does not exist", store_id)))?;

        let result = match range {
            None => {
                let live =
                    events::event_counts(db, EventTable::Live, EventScope::Store(store_id), None)
                        .await?;
                let funnel = Funnel {
                    views: live.views,
                    purchases: store.order_count,
                    add_to_carts: live.add_to_carts,
                    checkouts: live.checkouts,
                    revenue: store.total_revenue,
                };
                ConversionResult::store(store_id, funnel, ConversionSource::HybridCached)
            }
            Some(range) => {
                // 天级汇总只能回答整天对齐的范围
                let totals = match range.whole_days() {
                    Some((from_day, to_day)) => {
                        rollups::store_rollup_totals(db, store_id, from_day, to_day).await?
                    }
                    None => Default::default(),
                };
                if totals.views > 0 {
                    let funnel = Funnel {
                        views: totals.views,
                        purchases: totals.purchases,
                        add_to_carts: totals.add_to_carts,
                        checkouts: totals.checkouts,
                        revenue: totals.revenue,
                    };
                    ConversionResult::store(store_id, funnel, ConversionSource::AggregatedStats)
                } else {
                    let raw = events::event_counts(
                        db,
                        EventTable::Live,
                        EventScope::Store(store_id),
                        Some(range.as_window()),
                    )
                    .await?;
                    let funnel = Funnel {
                        views: raw.views,
                        purchases: raw.purchases,
                        add_to_carts: raw.add_to_carts,
                        checkouts: raw.checkouts,
                        revenue: raw.revenue,
                    };
                    ConversionResult::store(store_id, funnel, ConversionSource::RawEvents)
                }
            }
        };

        debug!(
            "ConversionAnalytics: store {} -> {} views, {} purchases ({:?})",
            store_id, result.views, result.purchases, result.source
        );
        Ok(result)
    }

    /// 店铺内转化率最高的商品（实时事件聚合）
    pub async fn get_top_products_by_conversion(
        &self,
        store_id: i64,
        range: Option<&DateRange>,
        limit: Option<u64>,
    ) -> Result<Vec<TopProduct>> {
        let limit = self.limit_or_default(limit);
        info!(
            "ConversionAnalytics: top products for store {} (limit: {})",
            store_id, limit
        );

        let rows = events::top_products_by_conversion(
            self.storage.get_db(),
            store_id,
            range.map(DateRange::as_window),
            limit,
        )
        .await?;

        let products: Vec<TopProduct> = rows
            .into_iter()
            .map(|r| TopProduct {
                product_id: r.entity_id,
                views: r.views,
                purchases: r.purchases,
                add_to_carts: r.add_to_carts,
                revenue: r.revenue,
                conversion_rate: safe_rate(r.purchases, r.views),
            })
            .collect();

        debug!("ConversionAnalytics: {} top products", products.len());
        Ok(products)
    }

    /// 基于计数缓存的排行，view_count 需严格大于阈值；并列时顺序不定
    pub async fn get_top_products_by_conversion_cached(
        &self,
        store_id: Option<i64>,
        limit: Option<u64>,
    ) -> Result<Vec<CachedTopProduct>> {
        let limit = self.limit_or_default(limit);
        let min_views = self.settings.ranking_min_views.max(0);
        info!(
            "ConversionAnalytics: cached top products (store: {:?}, min views: {}, limit: {})",
            store_id, min_views, limit
        );

        let mut query = ProductEntity::find()
            .filter(product::Column::ViewCount.gt(min_views))
            .filter(product::Column::DeletedAt.is_null());
        if let Some(store_id) = store_id {
            query = query.filter(product::Column::StoreId.eq(store_id));
        }

        let rows = query
            .order_by(
                Expr::cust(safe_ratio("total_sales", "view_count")),
                Order::Desc,
            )
            .limit(limit)
            .all(self.storage.get_db())
            .await?;

        Ok(rows
            .into_iter()
            .map(|p| CachedTopProduct {
                product_id: p.id,
                store_id: p.store_id,
                conversion_rate: safe_rate(p.total_sales, p.view_count),
                view_count: p.view_count,
                total_sales: p.total_sales,
                name: p.name,
            })
            .collect())
    }

    /// 表现不佳分析
    ///
    /// 指定店铺时分析该店铺的商品，否则分析全部店铺。
    pub async fn get_underperforming_analysis(
        &self,
        store_id: Option<i64>,
        range: Option<&DateRange>,
    ) -> Result<UnderperformanceReport> {
        info!(
            "ConversionAnalytics: underperforming analysis (store: {:?}, range: {:?})",
            store_id, range
        );
        let db = self.storage.get_db();
        let window = range.map(DateRange::as_window);

        let (kind, rows) = match store_id {
            Some(store_id) => {
                if StoreEntity::find_by_id(store_id).one(db).await?.is_none() {
                    return Err(StatsError::not_found(format!(
                        "Store {} does not exist",
                        store_id
                    )));
                }
                (
                    CohortKind::Product,
                    events::grouped_product_counts(db, Some(store_id), window).await?,
                )
            }
            None => (
                CohortKind::Store,
                events::grouped_store_counts(db, window).await?,
            ),
        };

        let entries: Vec<CohortEntry> = rows
            .iter()
            .map(|r| CohortEntry {
                id: r.entity_id,
                views: r.views,
                purchases: r.purchases,
                revenue: r.revenue,
            })
            .collect();

        let report =
            underperforming::analyze(kind, &entries, self.settings.underperforming_min_views);
        debug!(
            "ConversionAnalytics: {} underperforming {}s out of {}",
            report.underperforming.len(),
            kind,
            report.benchmarks.cohort_size
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_result_rates() {
        let r = ConversionResult::product(
            1,
            Funnel {
                views: 100,
                purchases: 20,
                add_to_carts: 40,
                checkouts: 0,
                revenue: 0,
            },
            ConversionSource::HybridCached,
        );
        assert_eq!(r.conversion_rate, 0.2);
        assert_eq!(r.add_to_cart_rate, 0.4);
        assert_eq!(r.checkout_rate, None);
    }

    #[test]
    fn test_store_result_checkout_rate() {
        let r = ConversionResult::store(
            1,
            Funnel {
                views: 0,
                purchases: 0,
                add_to_carts: 0,
                checkouts: 0,
                revenue: 0,
            },
            ConversionSource::RawEvents,
        );
        assert_eq!(r.conversion_rate, 0.0);
        assert_eq!(r.checkout_rate, Some(0.0));
    }

    #[test]
    fn test_serialized_source_names() {
        let r = ConversionResult::product(
            7,
            Funnel {
                views: 1,
                purchases: 0,
                add_to_carts: 0,
                checkouts: 0,
                revenue: 0,
            },
            ConversionSource::AggregatedStats,
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["source"], "aggregatedStats");
        assert_eq!(json["entityId"], 7);
        assert!(json.get("checkoutRate").is_none());
        assert_eq!(
            serde_json::to_value(ConversionSource::HybridCached).unwrap(),
            "hybridCached"
        );
        assert_eq!(
            serde_json::to_value(ConversionSource::RawEvents).unwrap(),
            "rawEvents"
        );
    }
}
