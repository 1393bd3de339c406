//! Schedule Resolver
//!
//! 判断店铺在某一时刻是否营业。营业时间永远在店铺自己的时区内求值,
//! 与调用方所在时区无关。
//!
//! Rule precedence: a daily override (if present for the local date) wins
//! over the weekly rule. Malformed or missing time strings resolve to
//! closed instead of erroring. Closing past midnight is not supported;
//! a close before open simply never matches.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::db::models::{DailyOverride, Shop};
use crate::utils::time::parse_hhmm;

/// Outcome of schedule resolution for one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatus {
    pub is_open: bool,
    /// Effective hours for the local date; `None` when no rule applies
    pub effective_open: Option<NaiveTime>,
    pub effective_close: Option<NaiveTime>,
}

impl ResolvedStatus {
    fn closed() -> Self {
        Self {
            is_open: false,
            effective_open: None,
            effective_close: None,
        }
    }
}

fn local_in_shop_tz(shop: &Shop, at: DateTime<Utc>) -> Option<DateTime<Tz>> {
    let tz: Tz = shop.timezone.parse().ok()?;
    Some(at.with_timezone(&tz))
}

/// The override record effective for `at`'s local date, if any
pub fn active_override<'a>(shop: &'a Shop, at: DateTime<Utc>) -> Option<&'a DailyOverride> {
    let local = local_in_shop_tz(shop, at)?;
    let key = local.format("%Y-%m-%d").to_string();
    shop.daily_overrides.get(&key)
}

/// Resolve open/closed status and effective hours for one instant.
///
/// Bounds are inclusive on both ends: a shop closing at 17:00 is still
/// open at exactly 17:00.
pub fn resolve_status(shop: &Shop, at: DateTime<Utc>) -> ResolvedStatus {
    let Some(local) = local_in_shop_tz(shop, at) else {
        return ResolvedStatus::closed();
    };

    let weekly = shop.open_days.for_weekday(local.weekday());
    let key = local.format("%Y-%m-%d").to_string();

    let (open_str, close_str) = match shop.daily_overrides.get(&key) {
        Some(o) if !o.enabled => return ResolvedStatus::closed(),
        Some(o) => (
            o.open.clone().unwrap_or_else(|| weekly.open.clone()),
            o.close.clone().unwrap_or_else(|| weekly.close.clone()),
        ),
        None if !weekly.enabled => return ResolvedStatus::closed(),
        None => (weekly.open.clone(), weekly.close.clone()),
    };

    let (Some(open), Some(close)) = (parse_hhmm(&open_str), parse_hhmm(&close_str)) else {
        return ResolvedStatus::closed();
    };

    let now = local.time();
    ResolvedStatus {
        is_open: now >= open && now <= close,
        effective_open: Some(open),
        effective_close: Some(close),
    }
}
