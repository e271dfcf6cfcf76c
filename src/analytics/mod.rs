//! 后台批处理任务：天级汇总与归档

pub mod archival;
pub mod rollup;

pub use archival::{ArchivalReport, ArchivalTask, ArchiveTable};
pub use rollup::{DailyRollupBuilder, RollupReport, day_window};
