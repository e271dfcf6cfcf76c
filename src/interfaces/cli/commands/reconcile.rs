//! Reconcile command

use colored::Colorize;
use std::sync::Arc;

use crate::interfaces::cli::CliError;
use crate::stats::{ReconcileSummary, StatsReconciler};
use crate::storage::SeaOrmStorage;

/// 对账范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTarget {
    Store(i64),
    Product(i64),
    AllStores,
    AllProducts,
    Everything,
}

impl ReconcileTarget {
    pub fn from_flags(
        store: Option<i64>,
        product: Option<i64>,
        all_stores: bool,
        all_products: bool,
    ) -> Self {
        match (store, product, all_stores, all_products) {
            (Some(id), _, _, _) => ReconcileTarget::Store(id),
            (None, Some(id), _, _) => ReconcileTarget::Product(id),
            (None, None, true, false) => ReconcileTarget::AllStores,
            (None, None, false, true) => ReconcileTarget::AllProducts,
            _ => ReconcileTarget::Everything,
        }
    }
}

pub async fn run_reconcile(
    storage: Arc<SeaOrmStorage>,
    target: ReconcileTarget,
) -> Result<(), CliError> {
    let reconciler = StatsReconciler::new(storage);

    match target {
        ReconcileTarget::Store(store_id) => {
            let result = reconciler.recalculate_store_stats(store_id).await?;
            let stats = &result.stats;
            let verdict = if result.updated {
                "drift corrected".yellow()
            } else {
                "already in sync".green()
            };
            println!(
                "{} Store {} {}",
                "✓".bold().green(),
                store_id.to_string().cyan(),
                verdict
            );
            println!(
                "  products: {}  orders: {}  sales: {}  revenue: {}",
                stats.product_count, stats.order_count, stats.total_sales, stats.total_revenue
            );
            println!(
                "  views: {}  followers: {}  conversion rate: {}",
                stats.view_count, stats.follower_count, stats.conversion_rate
            );
        }
        ReconcileTarget::Product(product_id) => {
            let stats = reconciler.recalculate_product_stats(product_id).await?;
            println!(
                "{} Product {} reconciled",
                "✓".bold().green(),
                product_id.to_string().cyan()
            );
            println!(
                "  views: {}  likes: {}  sales: {}  reviews: {}  rating: {}",
                stats.view_count,
                stats.like_count,
                stats.total_sales,
                stats.review_count,
                stats
                    .average_rating
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        ReconcileTarget::AllStores => {
            let summary = reconciler.recalculate_all_store_stats().await?;
            print_summary("stores", &summary);
        }
        ReconcileTarget::AllProducts => {
            let summary = reconciler.recalculate_all_product_stats().await?;
            print_summary("products", &summary);
        }
        ReconcileTarget::Everything => {
            let products = reconciler.recalculate_all_product_stats().await?;
            print_summary("products", &products);
            let stores = reconciler.recalculate_all_store_stats().await?;
            print_summary("stores", &stores);
        }
    }
    Ok(())
}

fn print_summary(label: &str, summary: &ReconcileSummary) {
    println!(
        "{} Reconciled {} {} ({} updated, {} failed)",
        "ℹ".bold().blue(),
        summary.processed.to_string().green(),
        label,
        summary.updated.to_string().yellow(),
        summary.failed.to_string().red()
    );
    for err in &summary.errors {
        println!("  {} {}", "✗".red(), err.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_flags() {
        assert_eq!(
            ReconcileTarget::from_flags(Some(3), None, false, false),
            ReconcileTarget::Store(3)
        );
        assert_eq!(
            ReconcileTarget::from_flags(None, Some(7), false, false),
            ReconcileTarget::Product(7)
        );
        assert_eq!(
            ReconcileTarget::from_flags(None, None, true, false),
            ReconcileTarget::AllStores
        );
        assert_eq!(
            ReconcileTarget::from_flags(None, None, false, true),
            ReconcileTarget::AllProducts
        );
        assert_eq!(
            ReconcileTarget::from_flags(None, None, false, false),
            ReconcileTarget::Everything
        );
        assert_eq!(
            ReconcileTarget::from_flags(None, None, true, true),
            ReconcileTarget::Everything
        );
    }
}
