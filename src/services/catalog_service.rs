//! 领域写入路径
//!
//! 每个写入在一个事务里完成主写入，然后把对应的 [`CounterEvent`]
//! 交给 [`CounterMutator`]，计数维护以 savepoint 加入同一事务。

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, SqlErr, TransactionTrait,
};
use tracing::{debug, info};

use migration::entities::{
    LikeEntity, OrderEntity, ProductEntity, ReviewEntity, StoreEntity, category, event, like,
    order, product, product_category, product_variant, review, store,
};

use crate::errors::{Result, StatsError};
use crate::stats::{CounterEvent, CounterMutator, RecordedEvent};
use crate::storage::backend::events::insert_event;
use crate::storage::{EventType, LikeTarget, NewEvent, OrderStatus, SeaOrmStorage, StoreField};

/// 店铺可修改字段
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub view_count: Option<i64>,
    pub conversion_rate: Option<f64>,
}

impl StoreUpdate {
    fn changed_fields(&self, current: &store::Model) -> Vec<StoreField> {
        let mut changed = Vec::new();
        if self.name.as_ref().is_some_and(|n| *n != current.name) {
            changed.push(StoreField::Name);
        }
        if self.view_count.is_some_and(|v| v != current.view_count) {
            changed.push(StoreField::ViewCount);
        }
        if self
            .conversion_rate
            .is_some_and(|r| r != current.conversion_rate)
        {
            changed.push(StoreField::ConversionRate);
        }
        changed
    }
}

pub struct CatalogService {
    storage: Arc<SeaOrmStorage>,
    mutator: CounterMutator,
}

impl CatalogService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let mutator = CounterMutator::new(storage.retry_config());
        Self { storage, mutator }
    }

    pub fn mutator(&self) -> &CounterMutator {
        &self.mutator
    }

    // ============ 店铺 ============

    pub async fn create_store(&self, name: &str) -> Result<store::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StatsError::validation("Store name must not be empty"));
        }

        let model = store::ActiveModel {
            name: Set(name.to_string()),
            view_count: Set(0),
            follower_count: Set(0),
            product_count: Set(0),
            order_count: Set(0),
            total_sales: Set(0),
            total_revenue: Set(0),
            conversion_rate: Set(0.0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.storage.get_db())
        .await?;

        info!("Store {} created", model.id);
        Ok(model)
    }

    /// 修改店铺字段；view_count 变化会触发转化率重算
    pub async fn update_store(&self, store_id: i64, update: StoreUpdate) -> Result<store::Model> {
        let txn = self.storage.get_db().begin().await?;
        let current = find_store(&txn, store_id).await?;
        let changed = update.changed_fields(&current);

        let mut active = current.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(view_count) = update.view_count {
            active.view_count = Set(view_count.max(0));
        }
        if let Some(rate) = update.conversion_rate {
            active.conversion_rate = Set(rate);
        }
        active.update(&txn).await?;

        self.mutator
            .apply(&txn, &CounterEvent::StoreUpdated { store_id, changed })
            .await;
        txn.commit().await?;

        find_store(self.storage.get_db(), store_id).await
    }

    // ============ 商品 ============

    pub async fn create_product(&self, store_id: i64, name: &str) -> Result<product::Model> {
        let txn = self.storage.get_db().begin().await?;
        find_store(&txn, store_id).await?;

        let model = product::ActiveModel {
            store_id: Set(store_id),
            name: Set(name.to_string()),
            view_count: Set(0),
            like_count: Set(0),
            total_sales: Set(0),
            review_count: Set(0),
            average_rating: Set(None),
            deleted_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        self.mutator
            .apply(&txn, &CounterEvent::ProductInserted { store_id })
            .await;
        txn.commit().await?;

        debug!("Product {} created in store {}", model.id, store_id);
        Ok(model)
    }

    /// 软删除；已删除的商品不重复扣减
    pub async fn soft_delete_product(&self, product_id: i64) -> Result<()> {
        let txn = self.storage.get_db().begin().await?;
        let current = find_product(&txn, product_id).await?;
        if current.deleted_at.is_some() {
            return Ok(());
        }
        let store_id = current.store_id;

        let mut active = current.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        self.mutator
            .apply(&txn, &CounterEvent::ProductSoftDeleted { store_id })
            .await;
        txn.commit().await?;
        Ok(())
    }

    pub async fn restore_product(&self, product_id: i64) -> Result<()> {
        let txn = self.storage.get_db().begin().await?;
        let current = find_product(&txn, product_id).await?;
        if current.deleted_at.is_none() {
            return Ok(());
        }
        let store_id = current.store_id;

        let mut active = current.into_active_model();
        active.deleted_at = Set(None);
        active.update(&txn).await?;

        self.mutator
            .apply(&txn, &CounterEvent::ProductRestored { store_id })
            .await;
        txn.commit().await?;
        Ok(())
    }

    /// 硬删除；软删除过的商品已经扣减过，不再发出 ProductRemoved
    pub async fn delete_product(&self, product_id: i64) -> Result<()> {
        let txn = self.storage.get_db().begin().await?;
        let current = find_product(&txn, product_id).await?;
        let was_live = current.deleted_at.is_none();
        let store_id = current.store_id;

        ProductEntity::delete_by_id(product_id).exec(&txn).await?;

        if was_live {
            self.mutator
                .apply(&txn, &CounterEvent::ProductRemoved { store_id })
                .await;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn add_variant(
        &self,
        product_id: i64,
        sku: &str,
        price: i64,
    ) -> Result<product_variant::Model> {
        find_product(self.storage.get_db(), product_id).await?;
        let model = product_variant::ActiveModel {
            product_id: Set(product_id),
            sku: Set(sku.to_string()),
            price: Set(price),
            ..Default::default()
        }
        .insert(self.storage.get_db())
        .await?;
        Ok(model)
    }

    pub async fn create_category(&self, store_id: i64, name: &str) -> Result<category::Model> {
        find_store(self.storage.get_db(), store_id).await?;
        let model = category::ActiveModel {
            store_id: Set(store_id),
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(self.storage.get_db())
        .await?;
        Ok(model)
    }

    pub async fn assign_category(&self, product_id: i64, category_id: i64) -> Result<()> {
        product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
        }
        .insert(self.storage.get_db())
        .await?;
        Ok(())
    }

    // ============ 评论 ============

    pub async fn add_review(
        &self,
        product_id: i64,
        user_id: i64,
        rating: i32,
    ) -> Result<review::Model> {
        if !(1..=5).contains(&rating) {
            return Err(StatsError::validation(format!(
                "Rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let txn = self.storage.get_db().begin().await?;
        find_product(&txn, product_id).await?;

        let model = review::ActiveModel {
            product_id: Set(product_id),
            user_id: Set(user_id),
            rating: Set(rating),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        self.mutator
            .apply(&txn, &CounterEvent::ReviewWritten { product_id })
            .await;
        txn.commit().await?;
        Ok(model)
    }

    pub async fn remove_review(&self, review_id: i64) -> Result<()> {
        let txn = self.storage.get_db().begin().await?;
        let review = ReviewEntity::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StatsError::not_found(format!("Review {} does not exist", review_id)))?;
        let product_id = review.product_id;

        ReviewEntity::delete_by_id(review_id).exec(&txn).await?;

        self.mutator
            .apply(&txn, &CounterEvent::ReviewRemoved { product_id })
            .await;
        txn.commit().await?;
        Ok(())
    }

    // ============ 点赞 ============

    /// 点赞；重复点赞被 likes 表唯一约束拒绝
    ///
    /// 同时向事件日志追加一条 LIKE 事件，供对账器使用。
    pub async fn add_like(&self, user_id: i64, target: LikeTarget) -> Result<like::Model> {
        let txn = self.storage.get_db().begin().await?;
        let (product_id, store_id) = resolve_like_target(&txn, target).await?;

        let (like_product, like_store) = match target {
            LikeTarget::Product(id) => (Some(id), None),
            LikeTarget::Store(id) => (None, Some(id)),
        };
        let model = like::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(like_product),
            store_id: Set(like_store),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                StatsError::validation(format!("User {} already liked {:?}", user_id, target))
            }
            _ => e.into(),
        })?;

        insert_event(
            &txn,
            &like_event(EventType::Like, target, user_id, product_id, store_id),
        )
        .await?;

        self.mutator
            .apply(&txn, &CounterEvent::LikeInserted(target))
            .await;
        txn.commit().await?;
        Ok(model)
    }

    /// 取消点赞；未点赞时返回 false
    pub async fn remove_like(&self, user_id: i64, target: LikeTarget) -> Result<bool> {
        let txn = self.storage.get_db().begin().await?;
        let (product_id, store_id) = resolve_like_target(&txn, target).await?;

        let filter = match target {
            LikeTarget::Product(id) => like::Column::ProductId.eq(id),
            LikeTarget::Store(id) => like::Column::StoreId.eq(id),
        };
        let deleted = LikeEntity::delete_many()
            .filter(like::Column::UserId.eq(user_id))
            .filter(filter)
            .exec(&txn)
            .await?
            .rows_affected;

        if deleted == 0 {
            return Ok(false);
        }

        insert_event(
            &txn,
            &like_event(EventType::Unlike, target, user_id, product_id, store_id),
        )
        .await?;

        self.mutator
            .apply(&txn, &CounterEvent::LikeRemoved(target))
            .await;
        txn.commit().await?;
        Ok(true)
    }

    // ============ 订单 ============

    pub async fn create_order(
        &self,
        store_id: i64,
        user_id: Option<i64>,
        status: OrderStatus,
        total: i64,
    ) -> Result<order::Model> {
        if total < 0 {
            return Err(StatsError::validation("Order total must not be negative"));
        }

        let txn = self.storage.get_db().begin().await?;
        find_store(&txn, store_id).await?;

        let now = Utc::now();
        let model = order::ActiveModel {
            store_id: Set(store_id),
            user_id: Set(user_id),
            status: Set(status.as_ref().to_string()),
            total: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        self.mutator
            .apply(
                &txn,
                &CounterEvent::OrderStatusChanged {
                    order_id: model.id,
                    store_id,
                    old: None,
                    new: status,
                    total,
                },
            )
            .await;
        txn.commit().await?;
        Ok(model)
    }

    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<order::Model> {
        let txn = self.storage.get_db().begin().await?;
        let current = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StatsError::not_found(format!("Order {} does not exist", order_id)))?;

        let old_status = current.status.parse::<OrderStatus>().ok();
        let store_id = current.store_id;
        let total = current.total;

        let mut active = current.into_active_model();
        active.status = Set(new_status.as_ref().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        self.mutator
            .apply(
                &txn,
                &CounterEvent::OrderStatusChanged {
                    order_id,
                    store_id,
                    old: old_status,
                    new: new_status,
                    total,
                },
            )
            .await;
        txn.commit().await?;
        Ok(updated)
    }

    // ============ 事件 ============

    /// 追加一条交互事件；只给出商品时自动补全所属店铺
    pub async fn record_event(&self, mut new: NewEvent) -> Result<event::Model> {
        if new.product_id.is_none() && new.store_id.is_none() {
            return Err(StatsError::validation(
                "An event must reference a product or a store",
            ));
        }

        let txn = self.storage.get_db().begin().await?;
        if let Some(product_id) = new.product_id {
            let product = find_product(&txn, product_id).await?;
            if new.store_id.is_none() {
                new.store_id = Some(product.store_id);
            }
        }

        let model = insert_event(&txn, &new).await?;

        self.mutator
            .apply(
                &txn,
                &CounterEvent::EventRecorded(RecordedEvent {
                    event_type: new.event_type,
                    product_id: new.product_id,
                    store_id: new.store_id,
                    value: new.value,
                }),
            )
            .await;
        txn.commit().await?;
        Ok(model)
    }
}

async fn find_store<C: ConnectionTrait>(conn: &C, store_id: i64) -> Result<store::Model> {
    StoreEntity::find_by_id(store_id)
        .one(conn)
        .await?
        .ok_or_else(|| StatsError::not_found(format!("Store {} does not exist", store_id)))
}

async fn find_product<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<product::Model> {
    ProductEntity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| StatsError::not_found(format!("Product {} does not exist", product_id)))
}

/// 返回 (product_id, store_id)；商品点赞同时带上所属店铺
async fn resolve_like_target<C: ConnectionTrait>(
    conn: &C,
    target: LikeTarget,
) -> Result<(Option<i64>, Option<i64>)> {
    match target {
        LikeTarget::Product(id) => {
            let product = find_product(conn, id).await?;
            Ok((Some(id), Some(product.store_id)))
        }
        LikeTarget::Store(id) => {
            find_store(conn, id).await?;
            Ok((None, Some(id)))
        }
    }
}

fn like_event(
    event_type: EventType,
    target: LikeTarget,
    user_id: i64,
    product_id: Option<i64>,
    store_id: Option<i64>,
) -> NewEvent {
    let base = match target {
        LikeTarget::Product(id) => NewEvent::product(event_type, id),
        LikeTarget::Store(id) => NewEvent::store(event_type, id),
    };
    NewEvent {
        product_id,
        store_id,
        ..base.with_user(user_id)
    }
}
