//! 店铺数据健康检查（只读）

use serde::Serialize;
use strum::{AsRefStr, Display};

use migration::entities::store;

use super::metrics::round2;
use crate::storage::backend::StoreCatalogHealth;

/// 健康等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthStatus::Excellent
        } else if score >= 75.0 {
            HealthStatus::Good
        } else if score >= 50.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

/// 缓存值与真实值对照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub cached_product_count: i64,
    pub actual_product_count: i64,
    pub product_count_match: bool,
    pub cached_order_count: i64,
    pub actual_order_count: i64,
    pub order_count_match: bool,
    pub cached_revenue: i64,
    pub actual_revenue: i64,
    pub revenue_match: bool,
    pub products_without_variants: i64,
    pub products_without_categories: i64,
    pub empty_categories: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub store_id: i64,
    pub health_score: f64,
    pub health_status: HealthStatus,
    pub metrics: HealthMetrics,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    /// 由缓存行与真实值得出报告
    pub fn evaluate(store: &store::Model, actual: &StoreCatalogHealth) -> Self {
        let metrics = HealthMetrics {
            cached_product_count: store.product_count,
            actual_product_count: actual.actual_product_count,
            product_count_match: store.product_count == actual.actual_product_count,
            cached_order_count: store.order_count,
            actual_order_count: actual.actual_order_count,
            order_count_match: store.order_count == actual.actual_order_count,
            cached_revenue: store.total_revenue,
            actual_revenue: actual.actual_revenue,
            revenue_match: store.total_revenue == actual.actual_revenue,
            products_without_variants: actual.products_without_variants,
            products_without_categories: actual.products_without_categories,
            empty_categories: actual.empty_categories,
        };

        let mut recommendations = Vec::new();
        let checks = [
            (
                metrics.product_count_match,
                "Cached product count is out of sync, run a store reconciliation".to_string(),
            ),
            (
                metrics.order_count_match,
                "Cached order count is out of sync, run a store reconciliation".to_string(),
            ),
            (
                metrics.revenue_match,
                "Cached revenue differs from completed orders, run a store reconciliation"
                    .to_string(),
            ),
            (
                metrics.products_without_variants == 0,
                format!(
                    "{} product(s) have no variants, add at least one variant to each",
                    metrics.products_without_variants
                ),
            ),
            (
                metrics.products_without_categories == 0,
                format!(
                    "{} product(s) are not assigned to any category",
                    metrics.products_without_categories
                ),
            ),
            (
                metrics.empty_categories == 0,
                format!(
                    "{} categories contain no products, assign products or remove them",
                    metrics.empty_categories
                ),
            ),
        ];

        let total = checks.len();
        let mut passed = 0;
        for (ok, recommendation) in checks {
            if ok {
                passed += 1;
            } else {
                recommendations.push(recommendation);
            }
        }

        let health_score = round2(passed as f64 / total as f64 * 100.0);
        Self {
            store_id: store.id,
            health_score,
            health_status: HealthStatus::from_score(health_score),
            metrics,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store_row(product_count: i64, order_count: i64, total_revenue: i64) -> store::Model {
        store::Model {
            id: 1,
            name: "demo".to_string(),
            view_count: 0,
            follower_count: 0,
            product_count,
            order_count,
            total_sales: 0,
            total_revenue,
            conversion_rate: 0.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(HealthStatus::from_score(100.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(90.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(83.33), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(75.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(66.67), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(50.0), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(49.99), HealthStatus::Critical);
    }

    #[test]
    fn test_all_checks_pass() {
        let actual = StoreCatalogHealth {
            actual_product_count: 2,
            actual_order_count: 1,
            actual_revenue: 900,
            ..Default::default()
        };
        let report = HealthReport::evaluate(&store_row(2, 1, 900), &actual);
        assert_eq!(report.health_score, 100.0);
        assert_eq!(report.health_status, HealthStatus::Excellent);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_failed_checks_produce_recommendations() {
        let actual = StoreCatalogHealth {
            actual_product_count: 3,
            actual_order_count: 1,
            actual_revenue: 900,
            products_without_variants: 1,
            ..Default::default()
        };
        let report = HealthReport::evaluate(&store_row(2, 1, 900), &actual);
        // 4 / 6
        assert_eq!(report.health_score, 66.67);
        assert_eq!(report.health_status, HealthStatus::Warning);
        assert_eq!(report.recommendations.len(), 2);
        assert!(!report.metrics.product_count_match);
    }

    #[test]
    fn test_serializes_camel_case() {
        let report = HealthReport::evaluate(&store_row(0, 0, 0), &StoreCatalogHealth::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["storeId"], 1);
        assert_eq!(json["healthStatus"], "EXCELLENT");
        assert_eq!(json["metrics"]["productCountMatch"], true);
    }
}
