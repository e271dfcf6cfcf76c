//! Configuration loading tests

use std::io::Write;
use storestats::config::{LogFormat, StaticConfig};
use tempfile::NamedTempFile;

#[test]
fn test_load_from_toml_file() {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    writeln!(
        file,
        r#"
[database]
database_url = "sqlite://custom.db?mode=rwc"
retry_count = 5

[stats]
ranking_min_views = 25

[archival]
enabled = false
"#
    )
    .unwrap();

    let config = StaticConfig::load_from(file.path().to_str());
    assert_eq!(config.database.database_url, "sqlite://custom.db?mode=rwc");
    assert_eq!(config.database.retry_count, 5);
    assert_eq!(config.stats.ranking_min_views, 25);
    assert!(!config.archival.enabled);
    // 未出现的字段使用默认值
    assert_eq!(config.database.pool_size, 10);
    assert_eq!(config.rollup.interval_minutes, 15);
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let config = StaticConfig::load_from(Some("/nonexistent/storestats-config.toml"));
    assert_eq!(config.archival.event_retention_days, 90);
    assert_eq!(config.archival.notification_retention_days, 180);
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("out.toml");

    let mut config = StaticConfig::default();
    config.stats.default_limit = 25;
    config.logging.format = LogFormat::Json;
    config.save_to_file(&path).unwrap();

    let reloaded = StaticConfig::load_from(path.to_str());
    assert_eq!(reloaded.stats.default_limit, 25);
    assert_eq!(reloaded.logging.format, LogFormat::Json);
}
