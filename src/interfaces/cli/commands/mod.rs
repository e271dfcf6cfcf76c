//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod analytics;
pub mod config_management;
mod health;
mod helpers;
mod jobs;
mod reconcile;

pub use analytics::*;
pub use health::*;
pub use jobs::*;
pub use reconcile::*;
