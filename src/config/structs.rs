use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "STORESTATS";

/// 日志输出格式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - database: 数据库连接与重试配置
/// - logging: 日志配置
/// - stats: 统计与分析参数
/// - archival: 事件归档配置
/// - rollup: 天级汇总任务配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub archival: ArchivalConfig,
    #[serde(default)]
    pub rollup: RollupConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：STORESTATS，分隔符：__
    /// 示例：STORESTATS__DATABASE__DATABASE_URL=sqlite://stats.db?mode=rwc
    pub fn load() -> Self {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 统计与分析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// 缓存排行榜的最低浏览量（严格大于）
    #[serde(default = "default_ranking_min_views")]
    pub ranking_min_views: i64,
    /// 表现不佳分析的最低浏览量（严格大于）
    #[serde(default = "default_underperforming_min_views")]
    pub underperforming_min_views: i64,
    #[serde(default = "default_top_limit")]
    pub default_limit: u64,
    /// worker 模式下全量对账间隔（分钟），0 表示不调度
    #[serde(default = "default_reconcile_interval_minutes")]
    pub reconcile_interval_minutes: u64,
}

/// 归档配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: u64,
    #[serde(default = "default_notification_retention_days")]
    pub notification_retention_days: u64,
    #[serde(default = "default_archive_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_archive_interval_hours")]
    pub interval_hours: u64,
}

/// 天级汇总配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rollup_interval_minutes")]
    pub interval_minutes: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_database_url() -> String {
    "sqlite://storestats.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_ranking_min_views() -> i64 {
    10
}

fn default_underperforming_min_views() -> i64 {
    10
}

fn default_top_limit() -> u64 {
    10
}

fn default_reconcile_interval_minutes() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

fn default_event_retention_days() -> u64 {
    90
}

fn default_notification_retention_days() -> u64 {
    180
}

fn default_archive_batch_size() -> u64 {
    1000
}

fn default_archive_interval_hours() -> u64 {
    24
}

fn default_rollup_interval_minutes() -> u64 {
    15
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            ranking_min_views: default_ranking_min_views(),
            underperforming_min_views: default_underperforming_min_views(),
            default_limit: default_top_limit(),
            reconcile_interval_minutes: default_reconcile_interval_minutes(),
        }
    }
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            event_retention_days: default_event_retention_days(),
            notification_retention_days: default_notification_retention_days(),
            batch_size: default_archive_batch_size(),
            interval_hours: default_archive_interval_hours(),
        }
    }
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_minutes: default_rollup_interval_minutes(),
        }
    }
}
