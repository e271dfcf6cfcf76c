//! CLI interface module
//!
//! This module provides command-line interface functionality for storestats.

pub mod commands;

use crate::cli::{Commands, ConfigCommands, ConversionTarget};
use crate::errors::StatsError;
use crate::storage::StorageFactory;
use commands::{
    ReconcileTarget, config_management, run_archive, run_reconcile, run_rollup, show_conversion,
    show_health, show_top_products, show_underperforming,
};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<StatsError> for CliError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::DateParse(_)
            | StatsError::InvalidDateRange(_)
            | StatsError::Validation(_) => CliError::ParseError(err.to_string()),
            StatsError::NotFound(_) => CliError::CommandError(err.to_string()),
            _ => CliError::StorageError(err.to_string()),
        }
    }
}

/// Run a CLI command from clap-parsed input
///
/// `Commands::Run` 由 worker 模式处理，不经过这里。
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // Generate doesn't need DB connection, handle it separately
    if let Commands::Config { action } = cmd {
        let ConfigCommands::Generate { output_path, force } = action;
        return config_management::config_generate(output_path, force).await;
    }

    // Create storage for commands that need it
    let storage = StorageFactory::create().await?;

    match cmd {
        Commands::Reconcile {
            store,
            product,
            all_stores,
            all_products,
        } => {
            let target = ReconcileTarget::from_flags(store, product, all_stores, all_products);
            run_reconcile(storage, target).await
        }

        Commands::Health { store_id, json } => show_health(storage, store_id, json).await,

        Commands::Conversion { target } => match target {
            ConversionTarget::Product { id, from, to, json } => {
                show_conversion(storage, false, id, from, to, json).await
            }
            ConversionTarget::Store { id, from, to, json } => {
                show_conversion(storage, true, id, from, to, json).await
            }
        },

        Commands::Top {
            store_id,
            from,
            to,
            limit,
            cached,
        } => show_top_products(storage, store_id, from, to, limit, cached).await,

        Commands::Underperforming { store, from, to } => {
            show_underperforming(storage, store, from, to).await
        }

        Commands::Archive => run_archive(storage).await,

        Commands::Rollup { day } => run_rollup(storage, day).await,

        Commands::Run => unreachable!("worker mode handled in main"),

        Commands::Config { .. } => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_error_mapping() {
        let err: CliError = StatsError::invalid_date_range("from after to").into();
        assert!(matches!(err, CliError::ParseError(_)));

        let err: CliError = StatsError::not_found("Store 9 does not exist").into();
        assert!(matches!(err, CliError::CommandError(_)));

        let err: CliError = StatsError::database_operation("locked").into();
        assert!(matches!(err, CliError::StorageError(_)));
    }

    #[test]
    fn test_format_simple_keeps_message() {
        let err = CliError::CommandError("boom".to_string());
        assert_eq!(err.format_simple(), "Command error: boom");
        assert_eq!(err.to_string(), "Command error: boom");
    }
}
