//! 计数增量维护（Counter Mutator）
//!
//! 领域写入路径在自己的事务里调用 [`CounterMutator::apply`]，
//! 计数写入以 savepoint 加入调用方事务。计数维护失败只记录日志，
//! 不会让主写入失败。

use sea_orm::{ConnectionTrait, DbErr, TransactionSession, TransactionTrait};
use tracing::{debug, error, trace};

use migration::entities::{product, store};

use crate::storage::backend::counters::CounterWriter;
use crate::storage::backend::retry::{self, RetryConfig};
use crate::storage::models::{CompletionTransition, EventType, LikeTarget, OrderStatus, StoreField};

/// 追加到事件日志的一条事件（计数相关部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event_type: EventType,
    pub product_id: Option<i64>,
    pub store_id: Option<i64>,
    pub value: Option<i64>,
}

/// 触发计数维护的领域写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEvent {
    LikeInserted(LikeTarget),
    LikeRemoved(LikeTarget),
    ReviewWritten {
        product_id: i64,
    },
    ReviewRemoved {
        product_id: i64,
    },
    ProductInserted {
        store_id: i64,
    },
    ProductRemoved {
        store_id: i64,
    },
    ProductSoftDeleted {
        store_id: i64,
    },
    ProductRestored {
        store_id: i64,
    },
    OrderStatusChanged {
        order_id: i64,
        store_id: i64,
        /// None 表示新建订单
        old: Option<OrderStatus>,
        new: OrderStatus,
        /// 订单金额（分）
        total: i64,
    },
    StoreUpdated {
        store_id: i64,
        changed: Vec<StoreField>,
    },
    EventRecorded(RecordedEvent),
}

impl CounterEvent {
    /// 日志中的操作名
    pub fn operation(&self) -> &'static str {
        match self {
            CounterEvent::LikeInserted(_) => "like_inserted",
            CounterEvent::LikeRemoved(_) => "like_removed",
            CounterEvent::ReviewWritten { .. } => "review_written",
            CounterEvent::ReviewRemoved { .. } => "review_removed",
            CounterEvent::ProductInserted { .. } => "product_inserted",
            CounterEvent::ProductRemoved { .. } => "product_removed",
            CounterEvent::ProductSoftDeleted { .. } => "product_soft_deleted",
            CounterEvent::ProductRestored { .. } => "product_restored",
            CounterEvent::OrderStatusChanged { .. } => "order_status_changed",
            CounterEvent::StoreUpdated { .. } => "store_updated",
            CounterEvent::EventRecorded(_) => "event_recorded",
        }
    }

    /// 日志中的实体标识，如 `product:12`
    pub fn entity(&self) -> String {
        match self {
            CounterEvent::LikeInserted(target) | CounterEvent::LikeRemoved(target) => match target {
                LikeTarget::Product(id) => format!("product:{}", id),
                LikeTarget::Store(id) => format!("store:{}", id),
            },
            CounterEvent::ReviewWritten { product_id }
            | CounterEvent::ReviewRemoved { product_id } => format!("product:{}", product_id),
            CounterEvent::ProductInserted { store_id }
            | CounterEvent::ProductRemoved { store_id }
            | CounterEvent::ProductSoftDeleted { store_id }
            | CounterEvent::ProductRestored { store_id }
            | CounterEvent::StoreUpdated { store_id, .. } => format!("store:{}", store_id),
            CounterEvent::OrderStatusChanged {
                order_id, store_id, ..
            } => format!("store:{} order:{}", store_id, order_id),
            CounterEvent::EventRecorded(ev) => match (ev.product_id, ev.store_id) {
                (Some(p), Some(s)) => format!("product:{} store:{}", p, s),
                (Some(p), None) => format!("product:{}", p),
                (None, Some(s)) => format!("store:{}", s),
                (None, None) => "none".to_string(),
            },
        }
    }

    /// 是否会改动任何计数；false 时直接跳过，不开事务
    pub fn affects_counters(&self) -> bool {
        match self {
            CounterEvent::StoreUpdated { changed, .. } => touches_view_count(changed),
            CounterEvent::OrderStatusChanged { old, new, .. } => {
                OrderStatus::transition(*old, *new) != CompletionTransition::Unchanged
            }
            CounterEvent::EventRecorded(ev) => {
                let counted = match ev.event_type {
                    EventType::View | EventType::Purchase => true,
                    // 点赞通过 likes 表计数
                    EventType::Like
                    | EventType::Unlike
                    | EventType::AddToCart
                    | EventType::Checkout
                    | EventType::Click => false,
                };
                counted && (ev.product_id.is_some() || ev.store_id.is_some())
            }
            _ => true,
        }
    }
}

/// 变更字段守卫：只有 view_count 变化才需要重算转化率，
/// 仅 conversion_rate 自身变化时直接返回，避免循环。
fn touches_view_count(changed: &[StoreField]) -> bool {
    changed.contains(&StoreField::ViewCount)
}

/// 一次计数维护的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// 没有需要改动的计数
    Skipped,
    /// 重试后仍失败，错误已记录
    Failed(String),
}

impl MutationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, MutationOutcome::Failed(_))
    }
}

/// 计数增量维护器
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterMutator {
    retry_config: RetryConfig,
}

impl CounterMutator {
    pub fn new(retry_config: RetryConfig) -> Self {
        Self { retry_config }
    }

    /// 应用一次计数维护，永不返回错误
    ///
    /// `conn` 可以是连接池，也可以是调用方的事务；计数写入在其上开启
    /// 嵌套事务（savepoint），失败时只回滚计数部分。
    pub async fn apply<C>(&self, conn: &C, event: &CounterEvent) -> MutationOutcome
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if !event.affects_counters() {
            trace!(
                "Counter mutation {} on {} skipped: no counter affected",
                event.operation(),
                event.entity()
            );
            return MutationOutcome::Skipped;
        }

        let result = retry::with_retry(event.operation(), self.retry_config, || async move {
            let txn = conn.begin().await?;
            Self::dispatch(&txn, event).await?;
            txn.commit().await
        })
        .await;

        match result {
            Ok(()) => {
                debug!(
                    "Counter mutation {} applied on {}",
                    event.operation(),
                    event.entity()
                );
                MutationOutcome::Applied
            }
            Err(e) => {
                error!(
                    "Counter mutation {} failed on {}: {}",
                    event.operation(),
                    event.entity(),
                    e
                );
                MutationOutcome::Failed(e.to_string())
            }
        }
    }

    /// 依次应用多条计数维护
    pub async fn apply_all<C>(&self, conn: &C, events: &[CounterEvent]) -> Vec<MutationOutcome>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.apply(conn, event).await);
        }
        outcomes
    }

    async fn dispatch<C: ConnectionTrait>(conn: &C, event: &CounterEvent) -> Result<(), DbErr> {
        let writer = CounterWriter::new(conn);
        match event {
            CounterEvent::LikeInserted(target) => Self::adjust_like(&writer, *target, 1).await,
            CounterEvent::LikeRemoved(target) => Self::adjust_like(&writer, *target, -1).await,
            CounterEvent::ReviewWritten { product_id }
            | CounterEvent::ReviewRemoved { product_id } => {
                writer.recompute_review_stats(*product_id).await?;
                Ok(())
            }
            CounterEvent::ProductInserted { store_id }
            | CounterEvent::ProductRestored { store_id } => {
                writer
                    .adjust_store(*store_id, store::Column::ProductCount, 1)
                    .await?;
                Ok(())
            }
            CounterEvent::ProductRemoved { store_id }
            | CounterEvent::ProductSoftDeleted { store_id } => {
                writer
                    .adjust_store(*store_id, store::Column::ProductCount, -1)
                    .await?;
                Ok(())
            }
            CounterEvent::OrderStatusChanged {
                store_id,
                old,
                new,
                total,
                ..
            } => {
                let total = (*total).max(0);
                let (orders, revenue) = match OrderStatus::transition(*old, *new) {
                    CompletionTransition::Entered => (1, total),
                    CompletionTransition::Left => (-1, -total),
                    CompletionTransition::Unchanged => return Ok(()),
                };
                writer.adjust_store_orders(*store_id, orders, revenue).await?;
                writer.refresh_conversion_rate(*store_id).await?;
                Ok(())
            }
            CounterEvent::StoreUpdated { store_id, changed } => {
                Self::store_updated(&writer, *store_id, changed).await
            }
            CounterEvent::EventRecorded(ev) => Self::event_recorded(&writer, ev).await,
        }
    }

    async fn adjust_like<C: ConnectionTrait>(
        writer: &CounterWriter<'_, C>,
        target: LikeTarget,
        delta: i64,
    ) -> Result<(), DbErr> {
        let affected = match target {
            LikeTarget::Product(id) => {
                writer
                    .adjust_product(id, product::Column::LikeCount, delta)
                    .await?
            }
            LikeTarget::Store(id) => {
                writer
                    .adjust_store(id, store::Column::FollowerCount, delta)
                    .await?
            }
        };
        if affected == 0 {
            debug!("Like target {:?} not found, counter untouched", target);
        }
        Ok(())
    }

    async fn store_updated<C: ConnectionTrait>(
        writer: &CounterWriter<'_, C>,
        store_id: i64,
        changed: &[StoreField],
    ) -> Result<(), DbErr> {
        if !touches_view_count(changed) {
            return Ok(());
        }
        writer.refresh_conversion_rate(store_id).await?;
        Ok(())
    }

    async fn event_recorded<C: ConnectionTrait>(
        writer: &CounterWriter<'_, C>,
        ev: &RecordedEvent,
    ) -> Result<(), DbErr> {
        let (product_col, store_col) = match ev.event_type {
            EventType::View => (product::Column::ViewCount, store::Column::ViewCount),
            EventType::Purchase => (product::Column::TotalSales, store::Column::TotalSales),
            EventType::Like
            | EventType::Unlike
            | EventType::AddToCart
            | EventType::Checkout
            | EventType::Click => return Ok(()),
        };

        if let Some(product_id) = ev.product_id {
            writer.adjust_product(product_id, product_col, 1).await?;
        }
        if let Some(store_id) = ev.store_id {
            writer.adjust_store(store_id, store_col, 1).await?;
            if ev.event_type == EventType::View {
                Self::store_updated(writer, store_id, &[StoreField::ViewCount]).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(event_type: EventType) -> CounterEvent {
        CounterEvent::EventRecorded(RecordedEvent {
            event_type,
            product_id: Some(1),
            store_id: Some(2),
            value: None,
        })
    }

    #[test]
    fn test_store_update_cycle_guard() {
        let only_rate = CounterEvent::StoreUpdated {
            store_id: 1,
            changed: vec![StoreField::ConversionRate],
        };
        assert!(!only_rate.affects_counters());

        let renamed = CounterEvent::StoreUpdated {
            store_id: 1,
            changed: vec![StoreField::Name],
        };
        assert!(!renamed.affects_counters());

        let viewed = CounterEvent::StoreUpdated {
            store_id: 1,
            changed: vec![StoreField::Name, StoreField::ViewCount],
        };
        assert!(viewed.affects_counters());
    }

    #[test]
    fn test_unchanged_order_transition_is_skipped() {
        let ev = CounterEvent::OrderStatusChanged {
            order_id: 1,
            store_id: 1,
            old: Some(OrderStatus::Shipped),
            new: OrderStatus::Delivered,
            total: 500,
        };
        assert!(!ev.affects_counters());

        let ev = CounterEvent::OrderStatusChanged {
            order_id: 1,
            store_id: 1,
            old: Some(OrderStatus::Delivered),
            new: OrderStatus::Refunded,
            total: 500,
        };
        assert!(ev.affects_counters());
    }

    #[test]
    fn test_only_view_and_purchase_events_touch_counters() {
        assert!(recorded(EventType::View).affects_counters());
        assert!(recorded(EventType::Purchase).affects_counters());
        assert!(!recorded(EventType::Like).affects_counters());
        assert!(!recorded(EventType::AddToCart).affects_counters());
        assert!(!recorded(EventType::Click).affects_counters());
    }

    #[test]
    fn test_entity_labels() {
        assert_eq!(
            CounterEvent::LikeInserted(LikeTarget::Store(9)).entity(),
            "store:9"
        );
        assert_eq!(recorded(EventType::View).entity(), "product:1 store:2");
        assert_eq!(
            CounterEvent::ReviewRemoved { product_id: 4 }.operation(),
            "review_removed"
        );
    }
}
