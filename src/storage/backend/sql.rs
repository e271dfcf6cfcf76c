//! 跨数据库的聚合表达式片段
//!
//! 只引用未限定表名的列（event_type / value），同一片段可用于
//! events 与 events_archive 两张结构相同的表。

use sea_orm::DbBackend;

use crate::storage::models::EventType;

/// CAST 目标整数类型
pub fn int_type(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::MySql => "SIGNED",
        DbBackend::Postgres => "BIGINT",
        _ => "INTEGER",
    }
}

/// `COUNT(CASE WHEN event_type = 'X' THEN 1 END)`
pub fn count_of(event_type: EventType) -> String {
    format!(
        "COUNT(CASE WHEN event_type = '{}' THEN 1 END)",
        event_type.as_ref()
    )
}

/// 指定类型事件的 value 合计，空集合为 0
///
/// PostgreSQL 的 SUM(bigint) 返回 numeric，统一 CAST 回整数。
pub fn sum_value_of(event_type: EventType, backend: DbBackend) -> String {
    format!(
        "COALESCE(CAST(SUM(CASE WHEN event_type = '{}' THEN COALESCE(value, 0) ELSE 0 END) AS {}), 0)",
        event_type.as_ref(),
        int_type(backend)
    )
}

/// 整数列合计，空集合为 0
pub fn sum_column(column: &str, backend: DbBackend) -> String {
    format!(
        "COALESCE(CAST(SUM({}) AS {}), 0)",
        column,
        int_type(backend)
    )
}

/// `numerator / denominator`，分母为 0 时取 0
pub fn safe_ratio(numerator: &str, denominator: &str) -> String {
    format!(
        "COALESCE(({}) * 1.0 / NULLIF({}, 0), 0)",
        numerator, denominator
    )
}
