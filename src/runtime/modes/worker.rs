//! Worker mode
//!
//! 启动对账、天级汇总和归档后台任务，直到收到 Ctrl+C。

use anyhow::Result;
use tracing::{info, warn};

use crate::runtime::lifetime;

/// Run worker mode
pub async fn run_worker() -> Result<()> {
    let context = lifetime::startup::prepare_worker_startup().await?;

    let spawned = lifetime::startup::spawn_background_tasks(&context);
    if spawned == 0 {
        warn!("No background task is enabled, worker will idle until shutdown");
    }
    info!("storestats worker running with {} background task(s)", spawned);

    lifetime::shutdown::listen_for_shutdown(context.storage.get_db().clone()).await;
    info!("storestats worker stopped");
    Ok(())
}
