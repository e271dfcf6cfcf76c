//! Background job tests: archival and daily rollups

use chrono::{Duration, Utc};
use migration::entities::{
    EventArchiveEntity, EventEntity, NotificationLogArchiveEntity, NotificationLogEntity,
    ProductStatsDailyEntity, StoreStatsDailyEntity, notification_log,
};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use std::sync::{Arc, Once};
use storestats::analytics::{ArchivalTask, DailyRollupBuilder};
use storestats::config::{ArchivalConfig, init_config};
use storestats::services::CatalogService;
use storestats::stats::StatsReconciler;
use storestats::storage::{EventType, NewEvent, SeaOrmStorage};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

fn archival_config(batch_size: u64) -> ArchivalConfig {
    ArchivalConfig {
        batch_size,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_archival_moves_only_expired_events() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();
    let old = Utc::now() - Duration::days(120);
    for _ in 0..5 {
        catalog
            .record_event(NewEvent::product(EventType::View, item.id).at(old))
            .await
            .unwrap();
    }
    catalog
        .record_event(NewEvent::product(EventType::View, item.id))
        .await
        .unwrap();

    // 小批量，覆盖多批次路径
    let task = ArchivalTask::with_config(storage.clone(), archival_config(2));
    let report = task.run_archival().await.unwrap();
    assert_eq!(report.events_archived, 5);
    assert!(report.errors.is_empty());

    let db = storage.get_db();
    assert_eq!(EventEntity::find().count(db).await.unwrap(), 1);
    assert_eq!(EventArchiveEntity::find().count(db).await.unwrap(), 5);

    // 再次执行没有可归档的行
    let again = task.run_archival().await.unwrap();
    assert_eq!(again.events_archived, 0);
    assert_eq!(EventArchiveEntity::find().count(db).await.unwrap(), 5);
}

#[tokio::test]
async fn test_reconcile_counts_archived_events() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());
    let reconciler = StatsReconciler::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();
    let old = Utc::now() - Duration::days(200);
    for _ in 0..3 {
        catalog
            .record_event(NewEvent::product(EventType::View, item.id).at(old))
            .await
            .unwrap();
    }
    catalog
        .record_event(NewEvent::product(EventType::Purchase, item.id).at(old))
        .await
        .unwrap();
    catalog
        .record_event(NewEvent::product(EventType::View, item.id))
        .await
        .unwrap();

    ArchivalTask::with_config(storage.clone(), archival_config(100))
        .run_archival()
        .await
        .unwrap();

    let product = reconciler.recalculate_product_stats(item.id).await.unwrap();
    assert_eq!(product.view_count, 4);
    assert_eq!(product.total_sales, 1);

    let store = reconciler.recalculate_store_stats(shop.id).await.unwrap();
    assert_eq!(store.stats.view_count, 4);
    assert_eq!(store.stats.total_sales, 1);
}

#[tokio::test]
async fn test_archival_of_notification_logs_uses_longer_retention() {
    let (storage, _dir) = create_temp_storage().await;
    let db = storage.get_db();

    for days in [100, 200] {
        notification_log::ActiveModel {
            user_id: Set(Some(1)),
            channel: Set("email".to_string()),
            message: Set(format!("sent {} days ago", days)),
            created_at: Set(Utc::now() - Duration::days(days)),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    let report = ArchivalTask::with_config(storage.clone(), archival_config(10))
        .run_archival()
        .await
        .unwrap();
    assert_eq!(report.notifications_archived, 1);
    assert_eq!(NotificationLogEntity::find().count(db).await.unwrap(), 1);
    assert_eq!(
        NotificationLogArchiveEntity::find().count(db).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_daily_rollup_is_idempotent() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());
    let builder = DailyRollupBuilder::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let a = catalog.create_product(shop.id, "A").await.unwrap();
    let b = catalog.create_product(shop.id, "B").await.unwrap();
    for id in [a.id, b.id] {
        catalog
            .record_event(NewEvent::product(EventType::View, id))
            .await
            .unwrap();
    }

    let today = Utc::now().date_naive();
    let first = builder.build_daily_rollups(today).await.unwrap();
    assert_eq!(first.product_rows, 2);
    assert_eq!(first.store_rows, 1);

    catalog
        .record_event(NewEvent::product(EventType::View, a.id))
        .await
        .unwrap();
    let second = builder.build_daily_rollups(today).await.unwrap();
    assert_eq!(second.product_rows, 2);

    let db = storage.get_db();
    assert_eq!(ProductStatsDailyEntity::find().count(db).await.unwrap(), 2);
    assert_eq!(StoreStatsDailyEntity::find().count(db).await.unwrap(), 1);

    let store_rows = StoreStatsDailyEntity::find().all(db).await.unwrap();
    assert_eq!(store_rows[0].views, 3);
}

#[tokio::test]
async fn test_rollup_of_empty_day_writes_nothing() {
    let (storage, _dir) = create_temp_storage().await;
    let builder = DailyRollupBuilder::new(storage.clone());

    let day = Utc::now().date_naive() - Duration::days(10);
    let report = builder.build_daily_rollups(day).await.unwrap();
    assert_eq!(report.product_rows, 0);
    assert_eq!(report.store_rows, 0);

    let recent = builder.build_recent().await.unwrap();
    assert_eq!(recent.len(), 2);
}
