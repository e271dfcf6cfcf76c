//! 事件日志的追加与聚合查询
//!
//! events 与 events_archive 结构相同，聚合条件只使用未限定表名的列，
//! 同一个 Condition 可以分别作用在两张表上。

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, Condition, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    ExprTrait, FromQueryResult, Order, QueryFilter, QueryOrder, QuerySelect, Select,
};

use migration::entities::{EventArchiveEntity, EventEntity, event};

use super::sql::{count_of, safe_ratio, sum_value_of};
use crate::storage::models::{EventType, NewEvent};

/// 事件表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTable {
    Live,
    Archive,
}

/// 聚合范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Product(i64),
    Store(i64),
}

/// 一个实体的事件计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromQueryResult)]
pub struct EventCounts {
    pub views: i64,
    pub likes: i64,
    pub unlikes: i64,
    pub add_to_carts: i64,
    pub checkouts: i64,
    pub purchases: i64,
    /// PURCHASE 事件 value 合计（分）
    pub revenue: i64,
}

impl EventCounts {
    /// 合并 live 与 archive 两部分
    pub fn merge(self, other: EventCounts) -> EventCounts {
        EventCounts {
            views: self.views + other.views,
            likes: self.likes + other.likes,
            unlikes: self.unlikes + other.unlikes,
            add_to_carts: self.add_to_carts + other.add_to_carts,
            checkouts: self.checkouts + other.checkouts,
            purchases: self.purchases + other.purchases,
            revenue: self.revenue + other.revenue,
        }
    }

    /// max(0, LIKE - UNLIKE)
    pub fn net_likes(&self) -> i64 {
        Ord::max(self.likes - self.unlikes, 0)
    }
}

/// 按实体分组的事件计数
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct GroupedEventCounts {
    pub entity_id: i64,
    pub store_id: Option<i64>,
    pub views: i64,
    pub add_to_carts: i64,
    pub checkouts: i64,
    pub purchases: i64,
    pub revenue: i64,
}

type Window = Option<(DateTime<Utc>, DateTime<Utc>)>;

fn window_condition(mut cond: Condition, window: Window) -> Condition {
    if let Some((from, to)) = window {
        cond = cond
            .add(Expr::col(event::Column::CreatedAt).gte(from))
            .add(Expr::col(event::Column::CreatedAt).lte(to));
    }
    cond
}

fn scope_condition(scope: EventScope, window: Window) -> Condition {
    let cond = match scope {
        EventScope::Product(id) => Condition::all().add(Expr::col(event::Column::ProductId).eq(id)),
        EventScope::Store(id) => Condition::all().add(Expr::col(event::Column::StoreId).eq(id)),
    };
    window_condition(cond, window)
}

fn with_count_columns<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Select<E> {
    select
        .column_as(Expr::cust(count_of(EventType::View)), "views")
        .column_as(Expr::cust(count_of(EventType::AddToCart)), "add_to_carts")
        .column_as(Expr::cust(count_of(EventType::Checkout)), "checkouts")
        .column_as(Expr::cust(count_of(EventType::Purchase)), "purchases")
        .column_as(
            Expr::cust(sum_value_of(EventType::Purchase, backend)),
            "revenue",
        )
}

fn counts_select<E: EntityTrait>(backend: DbBackend, cond: Condition) -> Select<E> {
    with_count_columns(E::find().select_only(), backend)
        .column_as(Expr::cust(count_of(EventType::Like)), "likes")
        .column_as(Expr::cust(count_of(EventType::Unlike)), "unlikes")
        .filter(cond)
}

/// 追加一条事件
pub async fn insert_event<C: ConnectionTrait>(
    conn: &C,
    new: &NewEvent,
) -> Result<event::Model, DbErr> {
    event::ActiveModel {
        event_type: Set(new.event_type.as_ref().to_string()),
        product_id: Set(new.product_id),
        store_id: Set(new.store_id),
        user_id: Set(new.user_id),
        invoked_on: Set(new.invoked_on().as_ref().to_string()),
        value: Set(new.value),
        created_at: Set(new.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// 单个实体在某张事件表上的计数，可选时间窗口 [from, to]
pub async fn event_counts<C: ConnectionTrait>(
    conn: &C,
    table: EventTable,
    scope: EventScope,
    window: Window,
) -> Result<EventCounts, DbErr> {
    let backend = conn.get_database_backend();
    let cond = scope_condition(scope, window);
    let row = match table {
        EventTable::Live => {
            counts_select::<EventEntity>(backend, cond)
                .into_model::<EventCounts>()
                .one(conn)
                .await?
        }
        EventTable::Archive => {
            counts_select::<EventArchiveEntity>(backend, cond)
                .into_model::<EventCounts>()
                .one(conn)
                .await?
        }
    };
    Ok(row.unwrap_or_default())
}

/// live + archive 合计
pub async fn lifetime_event_counts<C: ConnectionTrait>(
    conn: &C,
    scope: EventScope,
) -> Result<EventCounts, DbErr> {
    let live = event_counts(conn, EventTable::Live, scope, None).await?;
    let archived = event_counts(conn, EventTable::Archive, scope, None).await?;
    Ok(live.merge(archived))
}

/// 按商品分组（live 表），可限定店铺
pub async fn grouped_product_counts<C: ConnectionTrait>(
    conn: &C,
    store_id: Option<i64>,
    window: Window,
) -> Result<Vec<GroupedEventCounts>, DbErr> {
    product_grouped_select(conn.get_database_backend(), store_id, window)
        .order_by_asc(Expr::col(event::Column::ProductId))
        .into_model::<GroupedEventCounts>()
        .all(conn)
        .await
}

/// 按店铺分组（live 表）
pub async fn grouped_store_counts<C: ConnectionTrait>(
    conn: &C,
    window: Window,
) -> Result<Vec<GroupedEventCounts>, DbErr> {
    let backend = conn.get_database_backend();
    let cond = window_condition(
        Condition::all().add(Expr::col(event::Column::StoreId).is_not_null()),
        window,
    );
    with_count_columns(
        EventEntity::find()
            .select_only()
            .column_as(Expr::col(event::Column::StoreId), "entity_id")
            .column_as(Expr::col(event::Column::StoreId), "store_id"),
        backend,
    )
    .filter(cond)
    .group_by(Expr::col(event::Column::StoreId))
    .order_by_asc(Expr::col(event::Column::StoreId))
    .into_model::<GroupedEventCounts>()
    .all(conn)
    .await
}

/// 店铺内按 purchases / views 排序的商品（至少有一次浏览）
pub async fn top_products_by_conversion<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
    window: Window,
    limit: u64,
) -> Result<Vec<GroupedEventCounts>, DbErr> {
    let views = count_of(EventType::View);
    let purchases = count_of(EventType::Purchase);
    product_grouped_select(conn.get_database_backend(), Some(store_id), window)
        .having(Expr::cust(format!("{} > 0", views)))
        .order_by(Expr::cust(safe_ratio(&purchases, &views)), Order::Desc)
        .order_by(Expr::cust(views), Order::Desc)
        .limit(limit)
        .into_model::<GroupedEventCounts>()
        .all(conn)
        .await
}

fn product_grouped_select(
    backend: DbBackend,
    store_id: Option<i64>,
    window: Window,
) -> Select<EventEntity> {
    let mut cond = Condition::all().add(Expr::col(event::Column::ProductId).is_not_null());
    if let Some(store_id) = store_id {
        cond = cond.add(Expr::col(event::Column::StoreId).eq(store_id));
    }
    let cond = window_condition(cond, window);

    with_count_columns(
        EventEntity::find()
            .select_only()
            .column_as(Expr::col(event::Column::ProductId), "entity_id")
            .column_as(Expr::cust("MAX(store_id)"), "store_id"),
        backend,
    )
    .filter(cond)
    .group_by(Expr::col(event::Column::ProductId))
}
