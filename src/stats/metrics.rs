//! 派生指标的纯计算

/// 转化率上限（百分比）
pub const MAX_CONVERSION_RATE: f64 = 999.99;

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// numerator / denominator，分母不为正时返回 0
pub fn safe_rate(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// 店铺转化率：round(order_count / view_count * 100, 2)，截断到 [0, 999.99]
pub fn store_conversion_rate(order_count: i64, view_count: i64) -> f64 {
    if view_count <= 0 || order_count <= 0 {
        return 0.0;
    }
    round2(safe_rate(order_count, view_count) * 100.0).clamp(0.0, MAX_CONVERSION_RATE)
}

/// 中位数；空切片为 0
pub fn median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}
