//! 事件与通知日志归档
//!
//! 超过保留期的行分批复制到归档表（主键冲突时忽略），然后从 live 表删除。
//! 每批一个事务；中途失败后重新执行是幂等的。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, InsertStatement, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tracing::{debug, error, info, warn};

use migration::entities::{
    EventArchiveEntity, EventEntity, NotificationLogArchiveEntity, NotificationLogEntity, event,
    event_archive, notification_log, notification_log_archive,
};

use crate::config::ArchivalConfig;
use crate::errors::Result;
use crate::storage::SeaOrmStorage;
use crate::storage::backend::retry;

/// 单次归档最多处理的批次数
const MAX_ITERATIONS: u32 = 1000;

/// 可归档的表
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArchiveTable {
    Events,
    NotificationLogs,
}

impl ArchiveTable {
    pub fn retention_days(self, config: &ArchivalConfig) -> u64 {
        match self {
            ArchiveTable::Events => config.event_retention_days,
            ArchiveTable::NotificationLogs => config.notification_retention_days,
        }
    }

    async fn expired_ids<C: ConnectionTrait>(
        self,
        conn: &C,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> std::result::Result<Vec<i64>, DbErr> {
        match self {
            ArchiveTable::Events => {
                EventEntity::find()
                    .select_only()
                    .column(event::Column::Id)
                    .filter(event::Column::CreatedAt.lt(cutoff))
                    .order_by_asc(event::Column::Id)
                    .limit(limit)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            ArchiveTable::NotificationLogs => {
                NotificationLogEntity::find()
                    .select_only()
                    .column(notification_log::Column::Id)
                    .filter(notification_log::Column::CreatedAt.lt(cutoff))
                    .order_by_asc(notification_log::Column::Id)
                    .limit(limit)
                    .into_tuple()
                    .all(conn)
                    .await
            }
        }
    }

    /// INSERT INTO archive (...) SELECT ..., archived_at FROM live WHERE id IN (...)
    /// ON CONFLICT (id) DO NOTHING
    fn copy_statement(
        self,
        ids: &[i64],
        archived_at: DateTime<Utc>,
    ) -> std::result::Result<InsertStatement, DbErr> {
        let mut insert = Query::insert();
        let select = match self {
            ArchiveTable::Events => {
                insert.into_table(EventArchiveEntity).columns([
                    event_archive::Column::Id,
                    event_archive::Column::EventType,
                    event_archive::Column::ProductId,
                    event_archive::Column::StoreId,
                    event_archive::Column::UserId,
                    event_archive::Column::InvokedOn,
                    event_archive::Column::Value,
                    event_archive::Column::CreatedAt,
                    event_archive::Column::ArchivedAt,
                ]);
                insert.on_conflict(
                    OnConflict::column(event_archive::Column::Id)
                        .do_nothing()
                        .to_owned(),
                );
                Query::select()
                    .columns([
                        event::Column::Id,
                        event::Column::EventType,
                        event::Column::ProductId,
                        event::Column::StoreId,
                        event::Column::UserId,
                        event::Column::InvokedOn,
                        event::Column::Value,
                        event::Column::CreatedAt,
                    ])
                    .expr(Expr::val(archived_at))
                    .from(EventEntity)
                    .and_where(ExprTrait::is_in(
                        Expr::col(event::Column::Id),
                        ids.iter().copied(),
                    ))
                    .to_owned()
            }
            ArchiveTable::NotificationLogs => {
                insert.into_table(NotificationLogArchiveEntity).columns([
                    notification_log_archive::Column::Id,
                    notification_log_archive::Column::UserId,
                    notification_log_archive::Column::Channel,
                    notification_log_archive::Column::Message,
                    notification_log_archive::Column::CreatedAt,
                    notification_log_archive::Column::ArchivedAt,
                ]);
                insert.on_conflict(
                    OnConflict::column(notification_log_archive::Column::Id)
                        .do_nothing()
                        .to_owned(),
                );
                Query::select()
                    .columns([
                        notification_log::Column::Id,
                        notification_log::Column::UserId,
                        notification_log::Column::Channel,
                        notification_log::Column::Message,
                        notification_log::Column::CreatedAt,
                    ])
                    .expr(Expr::val(archived_at))
                    .from(NotificationLogEntity)
                    .and_where(ExprTrait::is_in(
                        Expr::col(notification_log::Column::Id),
                        ids.iter().copied(),
                    ))
                    .to_owned()
            }
        };

        insert
            .select_from(select)
            .map_err(|e| DbErr::Custom(format!("Failed to build archive insert: {}", e)))?;
        Ok(insert)
    }

    async fn delete_ids<C: ConnectionTrait>(
        self,
        conn: &C,
        ids: &[i64],
    ) -> std::result::Result<u64, DbErr> {
        let res = match self {
            ArchiveTable::Events => {
                EventEntity::delete_many()
                    .filter(ColumnTrait::is_in(&event::Column::Id, ids.iter().copied()))
                    .exec(conn)
                    .await?
            }
            ArchiveTable::NotificationLogs => {
                NotificationLogEntity::delete_many()
                    .filter(ColumnTrait::is_in(
                        &notification_log::Column::Id,
                        ids.iter().copied(),
                    ))
                    .exec(conn)
                    .await?
            }
        };
        Ok(res.rows_affected)
    }
}

/// 归档报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalReport {
    pub events_archived: u64,
    pub notifications_archived: u64,
    pub errors: Vec<String>,
}

/// 归档任务
pub struct ArchivalTask {
    storage: Arc<SeaOrmStorage>,
    config: ArchivalConfig,
}

impl ArchivalTask {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let config = crate::config::get_config().archival.clone();
        Self::with_config(storage, config)
    }

    pub fn with_config(storage: Arc<SeaOrmStorage>, config: ArchivalConfig) -> Self {
        Self { storage, config }
    }

    /// 归档所有表；一张表失败不影响另一张
    pub async fn run_archival(&self) -> Result<ArchivalReport> {
        let mut report = ArchivalReport::default();

        for table in [ArchiveTable::Events, ArchiveTable::NotificationLogs] {
            let cutoff = Utc::now() - Duration::days(table.retention_days(&self.config) as i64);
            match self.archive_table(table, cutoff).await {
                Ok(moved) => match table {
                    ArchiveTable::Events => report.events_archived = moved,
                    ArchiveTable::NotificationLogs => report.notifications_archived = moved,
                },
                Err(e) => {
                    error!("Failed to archive {}: {}", table, e);
                    report.errors.push(format!("{}: {}", table, e));
                }
            }
        }

        info!(
            "Archival completed: events {}, notification logs {}",
            report.events_archived, report.notifications_archived
        );
        Ok(report)
    }

    /// 归档 created_at 早于 cutoff 的行，返回移动行数
    pub async fn archive_table(
        &self,
        table: ArchiveTable,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let db = self.storage.get_db();
        let batch_size = Ord::max(self.config.batch_size, 1);

        let mut total_moved = 0u64;
        let mut iterations = 0;

        loop {
            if iterations >= MAX_ITERATIONS {
                warn!(
                    "Archival of {} reached max iterations {} (moved {} rows)",
                    table, MAX_ITERATIONS, total_moved
                );
                break;
            }

            let ids = table.expired_ids(db, cutoff, batch_size).await?;
            if ids.is_empty() {
                break;
            }

            let ids_ref = &ids[..];
            let moved = retry::with_retry("archive_batch", self.storage.retry_config(), || async move {
                let txn = db.begin().await?;
                let copy = table.copy_statement(ids_ref, Utc::now())?;
                txn.execute(&copy).await?;
                let deleted = table.delete_ids(&txn, ids_ref).await?;
                txn.commit().await?;
                Ok(deleted)
            })
            .await
            .map_err(|e| anyhow::anyhow!("archive batch of {} failed: {}", table, e))?;

            total_moved += moved;
            iterations += 1;

            debug!(
                "Archival batch {} of {}: moved {} rows (total {})",
                iterations, table, moved, total_moved
            );

            if (ids.len() as u64) < batch_size {
                break;
            }

            tokio::time::sleep(StdDuration::from_millis(100)).await;
        }

        Ok(total_moved)
    }

    /// 启动后台归档任务
    pub fn spawn_background_task(self: Arc<Self>, interval_hours: u64) {
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(Ord::max(interval_hours, 1) * 60 * 60);

            // 首次运行延迟 5 分钟
            tokio::time::sleep(StdDuration::from_secs(300)).await;

            loop {
                if let Err(e) = self.run_archival().await {
                    error!("Archival task failed: {}", e);
                }

                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Archival background task started (interval: {} hours)",
            interval_hours
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;

    #[test]
    fn test_copy_statement_shape() {
        let stmt = ArchiveTable::Events
            .copy_statement(&[1, 2, 3], Utc::now())
            .unwrap();
        let sql = stmt.to_string(SqliteQueryBuilder);
        assert!(sql.starts_with(r#"INSERT INTO "events_archive""#), "{sql}");
        assert!(sql.contains(r#"FROM "events""#), "{sql}");
        assert!(sql.contains("IN (1, 2, 3)"), "{sql}");
        assert!(sql.contains("DO NOTHING"), "{sql}");
    }

    #[test]
    fn test_retention_per_table() {
        let config = ArchivalConfig::default();
        assert_eq!(ArchiveTable::Events.retention_days(&config), 90);
        assert_eq!(ArchiveTable::NotificationLogs.retention_days(&config), 180);
        assert_eq!(ArchiveTable::NotificationLogs.to_string(), "notification_logs");
    }
}
