//! Helper functions shared by CLI commands

use serde::Serialize;

use crate::errors::StatsError;
use crate::interfaces::cli::CliError;
use crate::services::DateRange;

/// 以格式化 JSON 输出到 stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(StatsError::from)?;
    println!("{}", text);
    Ok(())
}

pub fn parse_range(from: Option<String>, to: Option<String>) -> Result<Option<DateRange>, CliError> {
    Ok(DateRange::parse(from.as_deref(), to.as_deref())?)
}

/// 0..1 小数显示为百分比
pub fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// 金额单位为分
pub fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money() {
        assert_eq!(money(0), "0.00");
        assert_eq!(money(12345), "123.45");
        assert_eq!(money(-5), "-0.05");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.2), "20.00%");
        assert_eq!(percent(0.0), "0.00%");
    }
}
