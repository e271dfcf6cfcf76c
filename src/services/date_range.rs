//! 分析查询的日期范围

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::errors::{Result, StatsError};

/// 闭区间 [from, to]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(StatsError::invalid_date_range(
                "Start date must not be later than end date",
            ));
        }
        Ok(Self { from, to })
    }

    /// 严格解析，支持 RFC3339 和 YYYY-MM-DD
    ///
    /// 两端都缺省时返回 `None`（不限时间）；只给一端、格式错误、
    /// 或 from > to 都是错误。日期格式的结束日取当天最后一刻。
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Option<Self>> {
        match (from, to) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(StatsError::invalid_date_range(
                "Start date is provided but end date is missing",
            )),
            (None, Some(_)) => Err(StatsError::invalid_date_range(
                "End date is provided but start date is missing",
            )),
            (Some(f), Some(t)) => {
                let from = parse_bound(f, NaiveTime::MIN)?;
                let to = parse_bound(t, end_of_day())?;
                Self::new(from, to).map(Some)
            }
        }
    }

    /// 覆盖的日历日（UTC）
    pub fn days(&self) -> (NaiveDate, NaiveDate) {
        (self.from.date_naive(), self.to.date_naive())
    }

    /// 范围恰好覆盖整天（from 为 00:00，to 为当天最后一刻）时返回日历日
    pub fn whole_days(&self) -> Option<(NaiveDate, NaiveDate)> {
        if self.from.time() == NaiveTime::MIN && self.to.time() == end_of_day() {
            Some(self.days())
        } else {
            None
        }
    }

    pub fn as_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.from, self.to)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(s: &str, date_only_time: NaiveTime) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(date_only_time).and_utc())
        .map_err(|_| {
            StatsError::date_parse(format!(
                "Invalid date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                s
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_bounds_means_unbounded() {
        assert_eq!(DateRange::parse(None, None).unwrap(), None);
    }

    #[test]
    fn test_date_only_covers_whole_days() {
        let range = DateRange::parse(Some("2026-03-01"), Some("2026-03-02"))
            .unwrap()
            .unwrap();
        assert_eq!(range.from.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(range.to.to_rfc3339(), "2026-03-02T23:59:59.999999999+00:00");
        assert_eq!(
            range.days(),
            (
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
            )
        );
    }

    #[test]
    fn test_rfc3339_is_normalized_to_utc() {
        let range = DateRange::parse(Some("2026-03-01T08:00:00+08:00"), Some("2026-03-01T12:00:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(range.from.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_one_sided_range_is_rejected() {
        let err = DateRange::parse(Some("2026-03-01"), None).unwrap_err();
        assert!(matches!(err, StatsError::InvalidDateRange(_)));
        let err = DateRange::parse(None, Some("2026-03-01")).unwrap_err();
        assert!(matches!(err, StatsError::InvalidDateRange(_)));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = DateRange::parse(Some("2026-03-05"), Some("2026-03-01")).unwrap_err();
        assert!(matches!(err, StatsError::InvalidDateRange(_)));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = DateRange::parse(Some("yesterday"), Some("2026-03-01")).unwrap_err();
        assert!(matches!(err, StatsError::DateParse(_)));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_whole_days_only_for_day_aligned_ranges() {
        let range = DateRange::parse(Some("2026-03-01"), Some("2026-03-02"))
            .unwrap()
            .unwrap();
        assert_eq!(
            range.whole_days(),
            Some((
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
            ))
        );

        let range = DateRange::parse(
            Some("2026-03-01T12:00:00Z"),
            Some("2026-03-01T13:00:00Z"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(range.whole_days(), None);

        let range = DateRange::parse(Some("2026-03-01"), Some("2026-03-02T00:00:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(range.whole_days(), None);
    }
}
