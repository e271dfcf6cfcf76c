//! Service layer for business logic
//!
//! 领域写入路径与转化分析，供 CLI 和 worker 模式共用。

mod catalog_service;
mod conversion_service;
pub mod date_range;
pub mod underperforming;

pub use catalog_service::*;
pub use conversion_service::*;
pub use date_range::DateRange;
pub use underperforming::{
    Benchmarks, CohortEntry, CohortKind, UnderperformanceReport, UnderperformingEntity,
};
