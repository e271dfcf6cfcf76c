//! storestats - denormalized statistics maintenance for an e-commerce database
//!
//! Keeps cached counters on stores and products (view, like, sales, review,
//! order and revenue counts, conversion rate) in step with the business
//! tables and the append-only event log, heals drift by recomputing them,
//! and serves conversion analytics from the cheapest data source that can
//! answer a query.
//!
//! # Architecture
//! - `stats`: counter mutator, reconciler and health checks
//! - `services`: catalog writes and conversion analytics
//! - `analytics`: background jobs (daily rollups, archival)
//! - `storage`: database backends and queries
//! - `interfaces`: command-line interface
//! - `config`: configuration management
//! - `runtime`: execution modes and lifecycle
//! - `system`: logging

pub mod analytics;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod stats;
pub mod storage;
pub mod system;
