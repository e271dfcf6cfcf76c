//! 领域枚举与写入参数
//!
//! 数据库中以字符串保存（event_type / invoked_on / status），
//! 在 Rust 侧统一转换为枚举，保证 match 穷尽。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 交互事件类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    View,
    Like,
    Unlike,
    AddToCart,
    Checkout,
    Purchase,
    Click,
}

/// 事件作用对象
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvokedOn {
    Product,
    Store,
}

/// 订单状态
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// 订单状态相对"已完成"集合的迁移方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTransition {
    Entered,
    Left,
    Unchanged,
}

impl OrderStatus {
    /// 计入 order_count / total_revenue 的状态集合
    pub const COMPLETED: [OrderStatus; 2] = [OrderStatus::Shipped, OrderStatus::Delivered];

    pub fn is_completed(self) -> bool {
        Self::COMPLETED.contains(&self)
    }

    /// 判断一次状态迁移是否跨越已完成集合边界
    ///
    /// `old = None` 表示新建订单。
    pub fn transition(old: Option<OrderStatus>, new: OrderStatus) -> CompletionTransition {
        let was = old.is_some_and(OrderStatus::is_completed);
        match (was, new.is_completed()) {
            (false, true) => CompletionTransition::Entered,
            (true, false) => CompletionTransition::Left,
            _ => CompletionTransition::Unchanged,
        }
    }

    pub fn completed_values() -> Vec<String> {
        Self::COMPLETED
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect()
    }
}

/// 点赞目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Product(i64),
    Store(i64),
}

/// 店铺上可被修改的字段（用于变更字段守卫）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StoreField {
    Name,
    ViewCount,
    FollowerCount,
    ProductCount,
    OrderCount,
    TotalSales,
    TotalRevenue,
    ConversionRate,
}

/// 追加事件的参数
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub product_id: Option<i64>,
    pub store_id: Option<i64>,
    pub user_id: Option<i64>,
    /// 购买金额（分）或数量
    pub value: Option<i64>,
    /// 为空时使用当前时间
    pub created_at: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn product(event_type: EventType, product_id: i64) -> Self {
        Self {
            event_type,
            product_id: Some(product_id),
            store_id: None,
            user_id: None,
            value: None,
            created_at: None,
        }
    }

    pub fn store(event_type: EventType, store_id: i64) -> Self {
        Self {
            event_type,
            product_id: None,
            store_id: Some(store_id),
            user_id: None,
            value: None,
            created_at: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// 有商品时记在商品上，否则记在店铺上
    pub fn invoked_on(&self) -> InvokedOn {
        if self.product_id.is_some() {
            InvokedOn::Product
        } else {
            InvokedOn::Store
        }
    }
}
