//! 数据库操作重试
//!
//! 统计写入和聚合查询在连接抖动、死锁、SQLite BUSY 时自动退避重试；
//! 其余错误直接返回给调用方。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 连接问题、死锁、锁超时，可重试
    Transient,
    /// 约束冲突、语法错误等，重试没有意义
    Permanent,
}

/// 对数据库错误分类
pub fn classify(err: &DbErr) -> ErrorClass {
    let transient = match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => is_transient_runtime_error(runtime_err),
        _ => false,
    };
    if transient {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

pub fn is_retryable_error(err: &DbErr) -> bool {
    classify(err) == ErrorClass::Transient
}

fn is_transient_runtime_error(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(code) = sqlx_err
                .deref()
                .as_database_error()
                .and_then(|db_err| db_err.code())
            {
                return matches!(
                    code.as_ref(),
                    // MySQL 死锁 / 锁超时
                    "1213" | "1205" |
                    // PostgreSQL 序列化失败 / 死锁
                    "40001" | "40P01" |
                    // SQLite BUSY / LOCKED
                    "5" | "6"
                );
            }
            is_transient_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_transient_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn is_transient_message(err_str: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "deadlock",
        "lock wait timeout",
        "database is locked",
        "database table is locked",
        "serialization failure",
    ];
    MARKERS.iter().any(|m| err_str.contains(m))
}

/// 重试配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn from_config(db: &DatabaseConfig) -> Self {
        Self {
            max_retries: db.retry_count,
            base_delay_ms: db.retry_base_delay_ms,
            max_delay_ms: db.retry_max_delay_ms.max(db.retry_base_delay_ms),
        }
    }

    /// 不重试（测试和一次性 CLI 命令）
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// 指数退避重试执行器
///
/// `operation` 每次调用都必须构造一个新的 future，因此闭包只应捕获引用或 Copy 值。
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("'{}' succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if classify(&err) == ErrorClass::Permanent {
            debug!("'{}' failed with non-retryable error: {}", operation_name, err);
            return Err(err);
        }
        if attempt >= config.max_retries {
            warn!(
                "'{}' failed after {} attempts, giving up: {}",
                operation_name,
                attempt + 1,
                err
            );
            return Err(err);
        }

        attempt += 1;
        let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
        warn!(
            "'{}' failed (attempt {}/{}): {}; retrying in {} ms",
            operation_name,
            attempt,
            config.max_retries + 1,
            err,
            delay
        );
        sleep(Duration::from_millis(delay)).await;
    }
}

/// 指数退避 + 0-25% 随机抖动
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    use rand::RngExt;
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn internal(msg: &str) -> sea_orm::error::RuntimeErr {
        sea_orm::error::RuntimeErr::Internal(msg.to_string())
    }

    #[test]
    fn test_connection_errors_are_transient() {
        let err = DbErr::ConnectionAcquire(sea_orm::error::ConnAcquireErr::Timeout);
        assert_eq!(classify(&err), ErrorClass::Transient);
        assert!(is_retryable_error(&DbErr::Conn(internal("connection lost"))));
    }

    #[test]
    fn test_lock_errors_are_transient() {
        assert!(is_retryable_error(&DbErr::Exec(internal(
            "Deadlock found when trying to get lock"
        ))));
        assert!(is_retryable_error(&DbErr::Query(internal("database is locked"))));
        assert!(is_retryable_error(&DbErr::Exec(internal(
            "Lock wait timeout exceeded"
        ))));
    }

    #[test]
    fn test_constraint_errors_are_permanent() {
        assert_eq!(
            classify(&DbErr::RecordNotFound("not found".to_string())),
            ErrorClass::Permanent
        );
        assert!(!is_retryable_error(&DbErr::Exec(internal(
            "UNIQUE constraint failed: stores.id"
        ))));
    }

    #[test]
    fn test_from_config() {
        let db = DatabaseConfig {
            retry_count: 5,
            retry_base_delay_ms: 50,
            retry_max_delay_ms: 10,
            ..DatabaseConfig::default()
        };
        let cfg = RetryConfig::from_config(&db);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.base_delay_ms, 50);
        // max 不得小于 base
        assert_eq!(cfg.max_delay_ms, 50);
    }

    #[test]
    fn test_calculate_backoff() {
        let delay1 = calculate_backoff(1, 100, 2000);
        assert!((100..=125).contains(&delay1));
        let delay3 = calculate_backoff(3, 100, 2000);
        assert!((400..=500).contains(&delay3));
        let capped = calculate_backoff(10, 100, 2000);
        assert!((2000..=2500).contains(&capped));
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 5,
            max_delay_ms: 20,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("recovers", config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbErr::Conn(internal("connection reset")))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_ms: 5,
            max_delay_ms: 20,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("gives_up", config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(DbErr::Query(internal("database is locked"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_permanent_error_runs_once() {
        let calls = AtomicU32::new(0);

        let result = with_retry("permanent", RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(DbErr::RecordNotFound("gone".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
