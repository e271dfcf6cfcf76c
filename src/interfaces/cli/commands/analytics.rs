//! Conversion analytics commands

use colored::Colorize;
use std::sync::Arc;

use super::helpers::{money, parse_range, percent, print_json};
use crate::interfaces::cli::CliError;
use crate::services::ConversionAnalyticsService;
use crate::storage::SeaOrmStorage;

pub async fn show_conversion(
    storage: Arc<SeaOrmStorage>,
    is_store: bool,
    id: i64,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let range = parse_range(from, to)?;
    let service = ConversionAnalyticsService::new(storage);

    let result = if is_store {
        service.compute_store_conversion(id, range.as_ref()).await?
    } else {
        service.compute_product_conversion(id, range.as_ref()).await?
    };

    if json {
        return print_json(&result);
    }

    let label = if is_store { "Store" } else { "Product" };
    println!(
        "{} {} {} conversion {}",
        "ℹ".bold().blue(),
        label,
        id.to_string().cyan(),
        format!("(source: {})", result.source.as_ref()).dimmed()
    );
    println!("  views:        {}", result.views);
    println!(
        "  add to cart:  {} ({})",
        result.add_to_carts,
        percent(result.add_to_cart_rate)
    );
    if let (Some(checkouts), Some(rate)) = (result.checkouts, result.checkout_rate) {
        println!("  checkouts:    {} ({})", checkouts, percent(rate));
    }
    println!(
        "  purchases:    {} ({})",
        result.purchases,
        percent(result.conversion_rate).green()
    );
    println!("  revenue:      {}", money(result.revenue));
    Ok(())
}

pub async fn show_top_products(
    storage: Arc<SeaOrmStorage>,
    store_id: i64,
    from: Option<String>,
    to: Option<String>,
    limit: Option<u64>,
    cached: bool,
) -> Result<(), CliError> {
    let service = ConversionAnalyticsService::new(storage);

    if cached {
        let products = service
            .get_top_products_by_conversion_cached(Some(store_id), limit)
            .await?;
        if products.is_empty() {
            println!("{} No products above the view threshold", "ℹ".bold().blue());
            return Ok(());
        }
        println!("{}", "Top products (cached counters):".bold().green());
        for (rank, p) in products.iter().enumerate() {
            println!(
                "  {:>2}. {} {} {} views, {} sales, {}",
                rank + 1,
                p.product_id.to_string().cyan(),
                p.name,
                p.view_count,
                p.total_sales,
                percent(p.conversion_rate).green()
            );
        }
        return Ok(());
    }

    let range = parse_range(from, to)?;
    let products = service
        .get_top_products_by_conversion(store_id, range.as_ref(), limit)
        .await?;
    if products.is_empty() {
        println!("{} No viewed products in range", "ℹ".bold().blue());
        return Ok(());
    }
    println!("{}", "Top products by conversion:".bold().green());
    for (rank, p) in products.iter().enumerate() {
        println!(
            "  {:>2}. {} {} views, {} purchases, {} revenue, {}",
            rank + 1,
            p.product_id.to_string().cyan(),
            p.views,
            p.purchases,
            money(p.revenue),
            percent(p.conversion_rate).green()
        );
    }
    Ok(())
}

/// 报告以 JSON 输出
pub async fn show_underperforming(
    storage: Arc<SeaOrmStorage>,
    store_id: Option<i64>,
    from: Option<String>,
    to: Option<String>,
) -> Result<(), CliError> {
    let range = parse_range(from, to)?;
    let report = ConversionAnalyticsService::new(storage)
        .get_underperforming_analysis(store_id, range.as_ref())
        .await?;
    print_json(&report)
}
