//! Counter mutator tests
//!
//! Incremental counter maintenance through CatalogService and CounterMutator,
//! against temporary SQLite databases.

use migration::entities::{LikeEntity, ProductEntity, StoreEntity, product, store};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use std::sync::{Arc, Once};
use storestats::config::init_config;
use storestats::services::{CatalogService, StoreUpdate};
use storestats::stats::{CounterEvent, CounterMutator, MutationOutcome, RecordedEvent};
use storestats::storage::{
    EventType, LikeTarget, NewEvent, OrderStatus, RetryConfig, SeaOrmStorage, StoreField,
};
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

async fn load_store(storage: &SeaOrmStorage, id: i64) -> store::Model {
    StoreEntity::find_by_id(id)
        .one(storage.get_db())
        .await
        .unwrap()
        .expect("store exists")
}

async fn load_product(storage: &SeaOrmStorage, id: i64) -> product::Model {
    ProductEntity::find_by_id(id)
        .one(storage.get_db())
        .await
        .unwrap()
        .expect("product exists")
}

#[tokio::test]
async fn test_product_likes_follow_inserts_and_removals() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();

    for user in 1..=3 {
        catalog
            .add_like(user, LikeTarget::Product(item.id))
            .await
            .unwrap();
    }
    assert!(
        catalog
            .remove_like(2, LikeTarget::Product(item.id))
            .await
            .unwrap()
    );

    assert_eq!(load_product(&storage, item.id).await.like_count, 2);
}

#[tokio::test]
async fn test_duplicate_like_is_rejected() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    catalog.add_like(1, LikeTarget::Store(shop.id)).await.unwrap();

    let err = catalog
        .add_like(1, LikeTarget::Store(shop.id))
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
    assert_eq!(load_store(&storage, shop.id).await.follower_count, 1);
}

#[tokio::test]
async fn test_removing_missing_like_changes_nothing() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let removed = catalog.remove_like(9, LikeTarget::Store(shop.id)).await.unwrap();

    assert!(!removed);
    assert_eq!(load_store(&storage, shop.id).await.follower_count, 0);
}

#[tokio::test]
async fn test_decrement_floors_at_zero() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());
    let mutator = CounterMutator::new(RetryConfig::none());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();

    let outcome = mutator
        .apply(
            storage.get_db(),
            &CounterEvent::LikeRemoved(LikeTarget::Product(item.id)),
        )
        .await;
    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(load_product(&storage, item.id).await.like_count, 0);

    mutator
        .apply(
            storage.get_db(),
            &CounterEvent::ProductRemoved { store_id: shop.id },
        )
        .await;
    mutator
        .apply(
            storage.get_db(),
            &CounterEvent::ProductRemoved { store_id: shop.id },
        )
        .await;
    assert_eq!(load_store(&storage, shop.id).await.product_count, 0);
}

#[tokio::test]
async fn test_product_lifecycle_adjusts_product_count() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let a = catalog.create_product(shop.id, "A").await.unwrap();
    let b = catalog.create_product(shop.id, "B").await.unwrap();
    assert_eq!(load_store(&storage, shop.id).await.product_count, 2);

    catalog.soft_delete_product(a.id).await.unwrap();
    assert_eq!(load_store(&storage, shop.id).await.product_count, 1);

    catalog.restore_product(a.id).await.unwrap();
    assert_eq!(load_store(&storage, shop.id).await.product_count, 2);

    // 已软删除的商品再硬删除不重复扣减
    catalog.soft_delete_product(b.id).await.unwrap();
    catalog.delete_product(b.id).await.unwrap();
    assert_eq!(load_store(&storage, shop.id).await.product_count, 1);
}

#[tokio::test]
async fn test_order_cancelled_after_shipping_rolls_back_totals() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let order = catalog
        .create_order(shop.id, Some(1), OrderStatus::Pending, 5_000)
        .await
        .unwrap();
    let s = load_store(&storage, shop.id).await;
    assert_eq!((s.order_count, s.total_revenue), (0, 0));

    catalog
        .update_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    let s = load_store(&storage, shop.id).await;
    assert_eq!((s.order_count, s.total_revenue), (1, 5_000));

    // SHIPPED -> DELIVERED 仍在已完成集合内
    catalog
        .update_order_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap();
    let s = load_store(&storage, shop.id).await;
    assert_eq!((s.order_count, s.total_revenue), (1, 5_000));

    catalog
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    let s = load_store(&storage, shop.id).await;
    assert_eq!((s.order_count, s.total_revenue), (0, 0));
}

#[tokio::test]
async fn test_zero_view_store_keeps_zero_conversion_rate() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    catalog
        .create_order(shop.id, None, OrderStatus::Delivered, 1_200)
        .await
        .unwrap();

    let s = load_store(&storage, shop.id).await;
    assert_eq!(s.order_count, 1);
    assert_eq!(s.view_count, 0);
    assert_eq!(s.conversion_rate, 0.0);
}

#[tokio::test]
async fn test_view_events_refresh_store_conversion_rate() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();
    catalog
        .create_order(shop.id, None, OrderStatus::Shipped, 900)
        .await
        .unwrap();

    for _ in 0..4 {
        catalog
            .record_event(NewEvent::product(EventType::View, item.id))
            .await
            .unwrap();
    }

    let p = load_product(&storage, item.id).await;
    assert_eq!(p.view_count, 4);

    let s = load_store(&storage, shop.id).await;
    assert_eq!(s.view_count, 4);
    assert!((s.conversion_rate - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_purchase_event_increments_total_sales() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();

    catalog
        .record_event(NewEvent::product(EventType::Purchase, item.id).with_value(2_500))
        .await
        .unwrap();
    catalog
        .record_event(NewEvent::product(EventType::AddToCart, item.id))
        .await
        .unwrap();

    assert_eq!(load_product(&storage, item.id).await.total_sales, 1);
    assert_eq!(load_store(&storage, shop.id).await.total_sales, 1);
}

#[tokio::test]
async fn test_event_without_target_is_rejected() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage);

    let mut event = NewEvent::store(EventType::View, 1);
    event.store_id = None;

    let err = catalog.record_event(event).await.unwrap_err();
    assert!(err.is_user_facing());
}

#[tokio::test]
async fn test_conversion_rate_only_update_is_skipped() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());
    let mutator = CounterMutator::new(RetryConfig::none());

    let shop = catalog.create_store("Shop").await.unwrap();

    let outcome = mutator
        .apply(
            storage.get_db(),
            &CounterEvent::StoreUpdated {
                store_id: shop.id,
                changed: vec![StoreField::ConversionRate],
            },
        )
        .await;
    assert_eq!(outcome, MutationOutcome::Skipped);

    // 手动写入的转化率保持不变
    let updated = catalog
        .update_store(
            shop.id,
            StoreUpdate {
                conversion_rate: Some(12.5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.conversion_rate, 12.5);
    assert_eq!(load_store(&storage, shop.id).await.conversion_rate, 12.5);
}

#[tokio::test]
async fn test_reviews_recompute_average() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();

    catalog.add_review(item.id, 1, 5).await.unwrap();
    let second = catalog.add_review(item.id, 2, 4).await.unwrap();
    catalog.add_review(item.id, 3, 4).await.unwrap();

    let p = load_product(&storage, item.id).await;
    assert_eq!(p.review_count, 3);
    assert_eq!(p.average_rating, Some(4.33));

    catalog.remove_review(second.id).await.unwrap();
    let p = load_product(&storage, item.id).await;
    assert_eq!(p.review_count, 2);
    assert_eq!(p.average_rating, Some(4.5));

    assert!(catalog.add_review(item.id, 4, 6).await.is_err());
}

#[tokio::test]
async fn test_mutation_on_missing_entity_is_not_an_error() {
    let (storage, _dir) = create_temp_storage().await;
    let mutator = CounterMutator::new(RetryConfig::none());

    let outcome = mutator
        .apply(
            storage.get_db(),
            &CounterEvent::EventRecorded(RecordedEvent {
                event_type: EventType::View,
                product_id: Some(404),
                store_id: Some(404),
                value: None,
            }),
        )
        .await;
    assert!(!outcome.is_failed());
}

#[tokio::test]
async fn test_counter_failure_does_not_fail_domain_write() {
    let (storage, _dir) = create_temp_storage().await;
    let catalog = CatalogService::new(storage.clone());

    let shop = catalog.create_store("Shop").await.unwrap();
    let item = catalog.create_product(shop.id, "Item").await.unwrap();

    storage
        .get_db()
        .execute_unprepared(
            "CREATE TRIGGER fail_like_count BEFORE UPDATE OF like_count ON products \
             BEGIN SELECT RAISE(ABORT, 'like_count is locked'); END;",
        )
        .await
        .unwrap();

    // 计数写入失败只回滚 savepoint，点赞本身照常提交
    catalog
        .add_like(1, LikeTarget::Product(item.id))
        .await
        .unwrap();

    let likes = LikeEntity::find().count(storage.get_db()).await.unwrap();
    assert_eq!(likes, 1);
    assert_eq!(load_product(&storage, item.id).await.like_count, 0);

    let mutator = CounterMutator::new(RetryConfig::none());
    let outcome = mutator
        .apply(
            storage.get_db(),
            &CounterEvent::LikeInserted(LikeTarget::Product(item.id)),
        )
        .await;
    assert!(matches!(outcome, MutationOutcome::Failed(_)));
}
