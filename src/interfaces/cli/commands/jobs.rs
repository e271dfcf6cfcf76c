//! One-shot runs of the background jobs

use chrono::NaiveDate;
use colored::Colorize;
use std::sync::Arc;

use crate::analytics::{ArchivalTask, DailyRollupBuilder, RollupReport};
use crate::interfaces::cli::CliError;
use crate::storage::SeaOrmStorage;

pub async fn run_archive(storage: Arc<SeaOrmStorage>) -> Result<(), CliError> {
    let report = ArchivalTask::new(storage).run_archival().await?;

    println!(
        "{} Archived {} events, {} notification logs",
        "✓".bold().green(),
        report.events_archived.to_string().green(),
        report.notifications_archived.to_string().green()
    );

    if report.errors.is_empty() {
        Ok(())
    } else {
        for err in &report.errors {
            println!("  {} {}", "✗".red(), err);
        }
        Err(CliError::CommandError(format!(
            "{} table(s) failed to archive",
            report.errors.len()
        )))
    }
}

pub async fn run_rollup(storage: Arc<SeaOrmStorage>, day: Option<String>) -> Result<(), CliError> {
    let builder = DailyRollupBuilder::new(storage);

    let reports = match day {
        Some(day) => {
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|e| CliError::ParseError(format!("Invalid day '{}': {}", day, e)))?;
            vec![builder.build_daily_rollups(day).await?]
        }
        None => builder.build_recent().await?,
    };

    for report in &reports {
        print_rollup(report);
    }
    Ok(())
}

fn print_rollup(report: &RollupReport) {
    let day = report
        .day
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} Rollup {}: {} product rows, {} store rows",
        "✓".bold().green(),
        day.cyan(),
        report.product_rows,
        report.store_rows
    );
}
