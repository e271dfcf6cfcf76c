//! 表现不佳分析的评分
//!
//! 纯计算，输入为同一群组（同店铺的商品，或全部店铺）在时间窗口内的
//! 浏览、购买与收入。

use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::stats::metrics::{median, round2, safe_rate};

/// 最多返回的实体数
pub const MAX_RESULTS: usize = 10;

const CONVERSION_WEIGHT: f64 = 0.6;
const REVENUE_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CohortKind {
    Product,
    Store,
}

/// 群组中的一个实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortEntry {
    pub id: i64,
    pub views: i64,
    pub purchases: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderperformingEntity {
    pub id: i64,
    pub overall_score: f64,
    /// 相对最佳转化率的差距（百分比）
    pub conversion_gap: f64,
    /// 相对最佳收入的差距（百分比）
    pub revenue_gap: f64,
    pub conversion_rate: f64,
    pub views: i64,
    pub revenue: i64,
    pub issues: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarks {
    pub best_conversion_rate: f64,
    pub average_conversion_rate: f64,
    pub best_revenue: i64,
    pub median_views: f64,
    pub cohort_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderperformanceReport {
    #[serde(rename = "type")]
    pub kind: CohortKind,
    pub underperforming: Vec<UnderperformingEntity>,
    pub benchmarks: Benchmarks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 对群组评分；浏览量需严格大于 `min_views` 才参与
pub fn analyze(kind: CohortKind, entries: &[CohortEntry], min_views: i64) -> UnderperformanceReport {
    let cohort: Vec<&CohortEntry> = entries.iter().filter(|e| e.views > min_views).collect();
    let benchmarks = benchmarks(&cohort);

    if cohort.len() < 2 {
        return UnderperformanceReport {
            kind,
            underperforming: Vec::new(),
            benchmarks,
            message: Some(format!(
                "Not enough data: at least 2 {}s with more than {} views are required",
                kind, min_views
            )),
        };
    }

    let mut scored: Vec<UnderperformingEntity> = cohort
        .iter()
        .map(|e| score(e, &benchmarks))
        // 与最佳者没有差距的实体不算表现不佳
        .filter(|e| e.overall_score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.overall_score
            .total_cmp(&a.overall_score)
            .then(a.id.cmp(&b.id))
    });
    scored.truncate(MAX_RESULTS);

    UnderperformanceReport {
        kind,
        underperforming: scored,
        benchmarks,
        message: None,
    }
}

fn benchmarks(cohort: &[&CohortEntry]) -> Benchmarks {
    if cohort.is_empty() {
        return Benchmarks::default();
    }
    let rates: Vec<f64> = cohort
        .iter()
        .map(|e| safe_rate(e.purchases, e.views))
        .collect();
    let views: Vec<i64> = cohort.iter().map(|e| e.views).collect();

    Benchmarks {
        best_conversion_rate: rates.iter().copied().fold(0.0, f64::max),
        average_conversion_rate: rates.iter().sum::<f64>() / rates.len() as f64,
        best_revenue: cohort.iter().map(|e| e.revenue).max().unwrap_or(0),
        median_views: median(&views),
        cohort_size: cohort.len(),
    }
}

/// 相对最佳值的差距（百分比），最佳值不为正时为 0
fn gap(best: f64, value: f64) -> f64 {
    if best <= 0.0 {
        0.0
    } else {
        round2(((best - value) / best * 100.0).max(0.0))
    }
}

fn score(entry: &CohortEntry, bench: &Benchmarks) -> UnderperformingEntity {
    let conversion_rate = safe_rate(entry.purchases, entry.views);
    let conversion_gap = gap(bench.best_conversion_rate, conversion_rate);
    let revenue_gap = gap(bench.best_revenue as f64, entry.revenue as f64);
    let overall_score = round2(CONVERSION_WEIGHT * conversion_gap + REVENUE_WEIGHT * revenue_gap);

    let mut issues = Vec::new();
    let mut actions = Vec::new();

    if conversion_rate < bench.average_conversion_rate * 0.5 {
        issues.push("Low conversion rate".to_string());
        actions.push("Review pricing and product presentation".to_string());
        actions.push("Simplify the checkout flow".to_string());
    }
    if (entry.views as f64) < bench.median_views * 0.5 {
        issues.push("Low visibility".to_string());
        actions.push("Improve search keywords and listing quality".to_string());
        actions.push("Promote through campaigns or featured placement".to_string());
    }
    if revenue_gap > 50.0 {
        issues.push("Low revenue".to_string());
        actions.push("Introduce bundles or upsell offers".to_string());
    }

    UnderperformingEntity {
        id: entry.id,
        overall_score,
        conversion_gap,
        revenue_gap,
        conversion_rate,
        views: entry.views,
        revenue: entry.revenue,
        issues,
        recommended_actions: actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, views: i64, purchases: i64, revenue: i64) -> CohortEntry {
        CohortEntry {
            id,
            views,
            purchases,
            revenue,
        }
    }

    #[test]
    fn test_not_enough_data() {
        let report = analyze(
            CohortKind::Product,
            &[entry(1, 100, 10, 1000), entry(2, 5, 1, 100)],
            10,
        );
        assert!(report.underperforming.is_empty());
        assert_eq!(report.benchmarks.cohort_size, 1);
        assert!(report.message.unwrap().contains("Not enough data"));
    }

    #[test]
    fn test_views_must_exceed_threshold() {
        // 恰好 10 次浏览不参与
        let report = analyze(
            CohortKind::Store,
            &[entry(1, 10, 1, 100), entry(2, 10, 2, 200)],
            10,
        );
        assert_eq!(report.benchmarks.cohort_size, 0);
        assert!(report.message.is_some());
    }

    #[test]
    fn test_scores_relative_to_best() {
        let report = analyze(
            CohortKind::Product,
            &[entry(1, 100, 20, 2000), entry(2, 100, 5, 500)],
            10,
        );
        assert!(report.message.is_none());
        // 最佳者自身差距为 0，不出现在结果中
        assert_eq!(report.underperforming.len(), 1);

        let worst = &report.underperforming[0];
        assert_eq!(worst.id, 2);
        assert_eq!(worst.conversion_gap, 75.0);
        assert_eq!(worst.revenue_gap, 75.0);
        assert_eq!(worst.overall_score, 75.0);
        assert!(worst.issues.contains(&"Low conversion rate".to_string()));
        assert!(worst.issues.contains(&"Low revenue".to_string()));
        assert!(!worst.recommended_actions.is_empty());

        assert_eq!(report.benchmarks.best_conversion_rate, 0.2);
        assert_eq!(report.benchmarks.best_revenue, 2000);
        assert_eq!(report.benchmarks.median_views, 100.0);
    }

    #[test]
    fn test_low_visibility_against_median() {
        let report = analyze(
            CohortKind::Product,
            &[
                entry(1, 1000, 100, 5000),
                entry(2, 1000, 100, 5000),
                entry(3, 20, 1, 100),
            ],
            10,
        );
        let low = report
            .underperforming
            .iter()
            .find(|e| e.id == 3)
            .unwrap();
        assert!(low.issues.contains(&"Low visibility".to_string()));
    }

    #[test]
    fn test_sorted_and_capped() {
        let mut entries = vec![entry(0, 1000, 500, 100_000)];
        for id in 1..=15 {
            entries.push(entry(id, 100, id, id * 100));
        }
        let report = analyze(CohortKind::Product, &entries, 10);
        assert_eq!(report.underperforming.len(), MAX_RESULTS);
        let scores: Vec<f64> = report
            .underperforming
            .iter()
            .map(|e| e.overall_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(report.underperforming[0].id, 1);
    }

    #[test]
    fn test_serialized_shape() {
        let report = analyze(
            CohortKind::Store,
            &[entry(1, 100, 20, 2000), entry(2, 100, 5, 500)],
            10,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["type"], "store");
        assert!(json["underperforming"][0]["overallScore"].is_number());
        assert!(json["benchmarks"]["medianViews"].is_number());
        assert!(json.get("message").is_none());
    }
}
