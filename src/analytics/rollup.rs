//! 天级汇总构建
//!
//! 把某一天的 live 事件按商品、按店铺聚合后覆盖写入
//! product_stats_daily / store_stats_daily，重复执行结果相同。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::TransactionTrait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::storage::SeaOrmStorage;
use crate::storage::backend::{events, retry, rollups};

/// 单日构建结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupReport {
    pub day: Option<NaiveDate>,
    pub product_rows: usize,
    pub store_rows: usize,
}

pub struct DailyRollupBuilder {
    storage: Arc<SeaOrmStorage>,
}

/// 一天在 UTC 下的 [00:00:00, 23:59:59.999999999]
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::nanoseconds(1);
    (start, end)
}

impl DailyRollupBuilder {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 构建指定日期的汇总；已有行被覆盖，不会删除
    pub async fn build_daily_rollups(&self, day: NaiveDate) -> Result<RollupReport> {
        let db = self.storage.get_db();
        let window = Some(day_window(day));

        let product_rows = events::grouped_product_counts(db, None, window).await?;
        let store_rows = events::grouped_store_counts(db, window).await?;

        let (products, stores) = (&product_rows, &store_rows);
        let (written_products, written_stores) = retry::with_retry(
            "build_daily_rollups",
            self.storage.retry_config(),
            || async move {
                let txn = db.begin().await?;
                let p = rollups::upsert_product_daily(&txn, day, products).await?;
                let s = rollups::upsert_store_daily(&txn, day, stores).await?;
                txn.commit().await?;
                Ok((p, s))
            },
        )
        .await?;

        debug!(
            "Daily rollup {}: {} product rows, {} store rows",
            day, written_products, written_stores
        );
        Ok(RollupReport {
            day: Some(day),
            product_rows: written_products,
            store_rows: written_stores,
        })
    }

    /// 构建昨天和今天
    pub async fn build_recent(&self) -> Result<Vec<RollupReport>> {
        let today = Utc::now().date_naive();
        let mut reports = Vec::with_capacity(2);
        for day in [today - Duration::days(1), today] {
            reports.push(self.build_daily_rollups(day).await?);
        }
        Ok(reports)
    }

    /// 启动后台汇总任务
    pub fn spawn_background_task(self: Arc<Self>, interval_minutes: u64) {
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_minutes.max(1) * 60);

            loop {
                match self.build_recent().await {
                    Ok(reports) => {
                        for r in reports {
                            debug!(
                                "Rollup {:?} refreshed ({} products, {} stores)",
                                r.day, r.product_rows, r.store_rows
                            );
                        }
                    }
                    Err(e) => error!("Daily rollup task failed: {}", e),
                }

                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Daily rollup background task started (interval: {} minutes)",
            interval_minutes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_window_covers_whole_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_window(day);
        assert_eq!(start.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(end.date_naive(), day);
        assert_eq!((end - start).num_seconds(), 86_399);
    }
}
