//! 反规范化统计的维护：增量更新、对账与健康检查

pub mod health;
pub mod metrics;
pub mod mutator;
pub mod reconciler;

pub use health::{HealthMetrics, HealthReport, HealthStatus};
pub use mutator::{CounterEvent, CounterMutator, MutationOutcome, RecordedEvent};
pub use reconciler::{
    ProductStats, ReconcileSummary, StatsReconciler, StoreReconciliation, StoreStats,
};
