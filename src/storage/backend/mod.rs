//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

pub mod catalog;
mod connection;
pub mod counters;
pub mod events;
pub mod retry;
pub mod rollups;
pub mod sql;

use sea_orm::{DatabaseBackend, DatabaseConnection};
use tracing::info;

use crate::errors::{Result, StatsError};

pub use catalog::{ReviewStats, StoreCatalogHealth};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use counters::CounterWriter;
pub use events::{EventCounts, EventScope, EventTable, GroupedEventCounts};
pub use rollups::RollupTotals;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(StatsError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 重试配置
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(StatsError::database_config("DATABASE_URL 未设置"));
        }

        let backend_name = normalize_backend_name(backend_name);
        let retry_config = retry::RetryConfig::from_config(&crate::config::get_config().database);

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, &backend_name).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retry_config,
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        info!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn get_backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn database_backend(&self) -> DatabaseBackend {
        use sea_orm::ConnectionTrait;
        self.db.get_database_backend()
    }

    pub fn retry_config(&self) -> retry::RetryConfig {
        self.retry_config
    }
}
