//! Next-Occurrence Calculator
//!
//! 在指定时区内计算某个"星期几 + 时刻"的下一次出现。

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::utils::time::local_datetime_to_utc;

/// Next instant at which `weekday` + `time` occurs in `tz`, measured from
/// `now`.
///
/// Weekdays are compared on the ISO ordinal (Monday=1..Sunday=7). A
/// non-positive day delta normalizes forward by a week, except that
/// "today, later today" is preferred over "same day next week" when the
/// target time is still ahead of the local clock.
pub fn next_occurrence(
    weekday: Weekday,
    time: NaiveTime,
    tz: Tz,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let target = weekday.number_from_monday() as i64;
    let current = local_now.weekday().number_from_monday() as i64;

    let mut delta = target - current;
    if delta <= 0 {
        delta += 7;
    }
    if delta == 7 && time > local_now.time() {
        delta = 0;
    }

    let date = local_now.date_naive() + Duration::days(delta);
    local_datetime_to_utc(date, time, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Manila;

    fn hhmm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn manila_now(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Manila
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn crosses_to_the_following_week() {
        // now: Tuesday 2026-03-03 10:00 Manila, asking for Monday 09:00
        let got = next_occurrence(Weekday::Mon, hhmm(9, 0), Manila, manila_now(2026, 3, 3, 10, 0));
        assert_eq!(got, manila_now(2026, 3, 9, 9, 0));
    }

    #[test]
    fn prefers_later_today_when_time_is_ahead() {
        // now: Monday 08:00 local, asking for Monday 09:00 -> today
        let got = next_occurrence(Weekday::Mon, hhmm(9, 0), Manila, manila_now(2026, 3, 2, 8, 0));
        assert_eq!(got, manila_now(2026, 3, 2, 9, 0));
    }

    #[test]
    fn same_day_but_time_passed_goes_next_week() {
        let got = next_occurrence(Weekday::Mon, hhmm(9, 0), Manila, manila_now(2026, 3, 2, 10, 0));
        assert_eq!(got, manila_now(2026, 3, 9, 9, 0));
    }

    #[test]
    fn sunday_to_monday_is_tomorrow() {
        // now: Sunday 2026-03-01, target Monday -> delta -6 normalizes to 1
        let got = next_occurrence(Weekday::Mon, hhmm(9, 0), Manila, manila_now(2026, 3, 1, 12, 0));
        assert_eq!(got, manila_now(2026, 3, 2, 9, 0));
    }

    #[test]
    fn exact_time_match_is_not_later_today() {
        // now is exactly Monday 09:00; "later today" requires strictly ahead
        let got = next_occurrence(Weekday::Mon, hhmm(9, 0), Manila, manila_now(2026, 3, 2, 9, 0));
        assert_eq!(got, manila_now(2026, 3, 9, 9, 0));
    }
}
