//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for storestats using clap's derive macros.

use clap::{Parser, Subcommand};

/// storestats - denormalized store/product statistics maintenance
#[derive(Parser)]
#[command(name = "storestats")]
#[command(version)]
#[command(about = "Statistics sync, drift reconciliation and conversion analytics", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run worker mode (reconciliation, rollups and archival on schedule)
    Run,

    /// Recompute cached counters from source tables
    ///
    /// Without any flag, all products and all stores are reconciled.
    Reconcile {
        /// Reconcile a single store
        #[arg(long, conflicts_with_all = ["product", "all_stores", "all_products"])]
        store: Option<i64>,

        /// Reconcile a single product
        #[arg(long, conflicts_with_all = ["all_stores", "all_products"])]
        product: Option<i64>,

        /// Reconcile every store
        #[arg(long)]
        all_stores: bool,

        /// Reconcile every live product
        #[arg(long)]
        all_products: bool,
    },

    /// Check cached store counters against the source tables
    Health {
        /// Store ID
        store_id: i64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute a conversion funnel
    Conversion {
        #[command(subcommand)]
        target: ConversionTarget,
    },

    /// Top products of a store by conversion rate
    Top {
        /// Store ID
        store_id: i64,

        /// Range start (RFC3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Range end (RFC3339 or YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of products
        #[arg(long)]
        limit: Option<u64>,

        /// Rank from cached counters instead of the event log
        #[arg(long, conflicts_with_all = ["from", "to"])]
        cached: bool,
    },

    /// Find products (with --store) or stores falling behind their cohort
    Underperforming {
        /// Analyze the products of this store
        #[arg(long)]
        store: Option<i64>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },

    /// Move expired events and notification logs to the archive tables
    Archive,

    /// Build daily rollups (default: yesterday and today)
    Rollup {
        /// Day to build (YYYY-MM-DD)
        #[arg(long)]
        day: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Conversion targets
#[derive(Subcommand)]
pub enum ConversionTarget {
    /// Product conversion funnel
    Product {
        id: i64,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store conversion funnel
    Store {
        id: i64,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite existing file without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_conversion_product() {
        let cli = Cli::try_parse_from([
            "storestats",
            "conversion",
            "product",
            "42",
            "--from",
            "2026-01-01",
            "--to",
            "2026-01-31",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Conversion {
                target:
                    ConversionTarget::Product {
                        id,
                        from,
                        to,
                        json,
                    },
            }) => {
                assert_eq!(id, 42);
                assert_eq!(from.as_deref(), Some("2026-01-01"));
                assert_eq!(to.as_deref(), Some("2026-01-31"));
                assert!(json);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["storestats", "archive", "-c", "/etc/stats.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/stats.toml"));
        assert!(matches!(cli.command, Some(Commands::Archive)));
    }

    #[test]
    fn test_reconcile_store_conflicts_with_product() {
        let result = Cli::try_parse_from([
            "storestats",
            "reconcile",
            "--store",
            "1",
            "--product",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_top_cached_conflicts_with_range() {
        let result =
            Cli::try_parse_from(["storestats", "top", "1", "--cached", "--from", "2026-01-01"]);
        assert!(result.is_err());
    }
}
