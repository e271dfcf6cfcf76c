use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::analytics::{ArchivalTask, DailyRollupBuilder};
use crate::config::get_config;
use crate::stats::StatsReconciler;
use crate::storage::{SeaOrmStorage, StorageFactory};

/// worker 模式运行所需的上下文
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub reconciler: Arc<StatsReconciler>,
    pub rollup_builder: Arc<DailyRollupBuilder>,
    pub archival_task: Arc<ArchivalTask>,
}

/// 准备 worker 启动的上下文
/// 连接数据库、执行迁移并构造各后台任务
pub async fn prepare_worker_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to initialize storage")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let context = StartupContext {
        reconciler: Arc::new(StatsReconciler::new(storage.clone())),
        rollup_builder: Arc::new(DailyRollupBuilder::new(storage.clone())),
        archival_task: Arc::new(ArchivalTask::new(storage.clone())),
        storage,
    };

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}

/// 根据配置启动后台任务，返回启动的任务数
pub fn spawn_background_tasks(context: &StartupContext) -> usize {
    let config = get_config();
    let mut spawned = 0;

    if config.stats.reconcile_interval_minutes > 0 {
        context
            .reconciler
            .clone()
            .spawn_background_task(config.stats.reconcile_interval_minutes);
        spawned += 1;
    } else {
        info!("Stats reconciliation is not scheduled");
    }

    if config.rollup.enabled {
        context
            .rollup_builder
            .clone()
            .spawn_background_task(config.rollup.interval_minutes);
        spawned += 1;
    } else {
        info!("Daily rollup task disabled");
    }

    if config.archival.enabled {
        context
            .archival_task
            .clone()
            .spawn_background_task(config.archival.interval_hours);
        spawned += 1;
    } else {
        info!("Archival task disabled");
    }

    spawned
}
