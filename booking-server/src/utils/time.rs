//! 时间工具函数 - 业务时区转换
//!
//! 所有日期/时间 → 时间戳转换统一在 handler 或 service 层完成，
//! repository 层只接收 `i64` Unix millis。

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 解析时钟字符串 (HH:MM)，格式非法返回 None
///
/// Schedule evaluation must fail closed on malformed input, so this does
/// not produce an error value.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// 解析 IANA 时区名
pub fn parse_timezone(tz: &str) -> AppResult<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| AppError::validation(format!("Unknown timezone: {}", tz)))
}

/// Lowercase weekday key used by the seven-key schedule map
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Weekday from a lowercase English name; case-insensitive on input
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// 本地日期 + 时间 → UTC instant (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn local_datetime_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Instant → Unix millis，repository 层的存储格式
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Unix millis → instant
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_parses_clock_strings_only() {
        assert_eq!(
            parse_hhmm("09:30"),
            Some(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        );
        assert!(parse_hhmm("9am").is_none());
        assert!(parse_hhmm("25:00").is_none());
        assert!(parse_hhmm("").is_none());
    }

    #[test]
    fn weekday_names_round_trip() {
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            assert_eq!(weekday_from_name(weekday_key(day)), Some(day));
        }
        assert_eq!(weekday_from_name("Monday"), Some(Weekday::Mon));
        assert_eq!(weekday_from_name("lunes"), None);
    }

    #[test]
    fn millis_round_trip() {
        let at = Utc.with_ymd_and_hms(2026, 8, 24, 1, 30, 0).unwrap();
        assert_eq!(from_millis(to_millis(at)), Some(at));
    }
}
