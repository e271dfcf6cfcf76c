//! Health check command

use colored::Colorize;
use std::sync::Arc;

use super::helpers::{money, print_json};
use crate::interfaces::cli::CliError;
use crate::stats::{HealthStatus, StatsReconciler};
use crate::storage::SeaOrmStorage;

pub async fn show_health(
    storage: Arc<SeaOrmStorage>,
    store_id: i64,
    json: bool,
) -> Result<(), CliError> {
    let report = StatsReconciler::new(storage)
        .check_data_health(store_id)
        .await?;

    if json {
        return print_json(&report);
    }

    let status = report.health_status.to_string();
    let status = match report.health_status {
        HealthStatus::Excellent | HealthStatus::Good => status.green(),
        HealthStatus::Warning => status.yellow(),
        HealthStatus::Critical => status.red(),
    };
    println!(
        "{} Store {} health: {} ({:.0}/100)",
        "ℹ".bold().blue(),
        store_id.to_string().cyan(),
        status.bold(),
        report.health_score
    );

    let m = &report.metrics;
    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    println!(
        "  {} product count  cached {} / actual {}",
        mark(m.product_count_match),
        m.cached_product_count,
        m.actual_product_count
    );
    println!(
        "  {} order count    cached {} / actual {}",
        mark(m.order_count_match),
        m.cached_order_count,
        m.actual_order_count
    );
    println!(
        "  {} revenue        cached {} / actual {}",
        mark(m.revenue_match),
        money(m.cached_revenue),
        money(m.actual_revenue)
    );
    println!(
        "  products without variants: {}  without categories: {}  empty categories: {}",
        m.products_without_variants, m.products_without_categories, m.empty_categories
    );

    if !report.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations:".bold().yellow());
        for rec in &report.recommendations {
            println!("  - {}", rec);
        }
    }
    Ok(())
}
