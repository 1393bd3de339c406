//! Shop Model

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

use super::serde_helpers;

/// Weekly opening rule for one weekday
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenDay {
    #[serde(deserialize_with = "serde_helpers::bool_false", default)]
    pub enabled: bool,
    /// Opening time "HH:MM"; malformed values resolve to closed
    #[serde(default)]
    pub open: String,
    /// Closing time "HH:MM"
    #[serde(default)]
    pub close: String,
}

impl OpenDay {
    pub fn hours(open: &str, close: &str) -> Self {
        Self {
            enabled: true,
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// The seven fixed weekday keys of a shop schedule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenDays {
    pub monday: OpenDay,
    pub tuesday: OpenDay,
    pub wednesday: OpenDay,
    pub thursday: OpenDay,
    pub friday: OpenDay,
    pub saturday: OpenDay,
    pub sunday: OpenDay,
}

impl OpenDays {
    pub fn for_weekday(&self, weekday: Weekday) -> &OpenDay {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    fn for_weekday_mut(&mut self, weekday: Weekday) -> &mut OpenDay {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    /// Expand a first..=last weekday range with shared hours into the
    /// seven-key map. The range may wrap the week (e.g. friday..=monday);
    /// days outside it stay disabled.
    pub fn from_range(first: Weekday, last: Weekday, open: &str, close: &str) -> Self {
        let mut days = Self::default();
        let (a, b) = (first.number_from_monday(), last.number_from_monday());
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            let d = day.number_from_monday();
            let in_range = if a <= b {
                d >= a && d <= b
            } else {
                d >= a || d <= b
            };
            if in_range {
                *days.for_weekday_mut(day) = OpenDay::hours(open, close);
            }
        }
        days
    }
}

/// Date-specific schedule override; wins over the weekly rule for its date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyOverride {
    /// false closes the shop for the whole date regardless of the weekly rule
    #[serde(deserialize_with = "serde_helpers::bool_true", default = "default_true")]
    pub enabled: bool,
    /// Absent fields fall back to the weekly rule's times
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    /// Seats offered on this date when it departs from the norm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_seats: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// Physical table on the floor plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub table_number: i64,
    pub seats: i64,
}

impl TableSpec {
    /// Shop totals are derived from the floor plan, never stored separately
    /// from it (single source of truth).
    pub fn derive_totals(tables: &[TableSpec]) -> (i64, i64) {
        let seats = tables.iter().map(|t| t.seats.max(0)).sum();
        (seats, tables.len() as i64)
    }
}

/// Shop entity (店铺)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Stable user id of the owning account
    pub owner_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    /// IANA zone name; open/closed is always evaluated in this zone
    pub timezone: String,
    pub total_seats: i64,
    pub total_tables: i64,
    /// 0 <= available <= total, maintained by the reservation transactions
    pub available_seats: i64,
    pub available_tables: i64,
    pub open_days: OpenDays,
    /// Sparse "YYYY-MM-DD" -> override map
    #[serde(default)]
    pub daily_overrides: BTreeMap<String, DailyOverride>,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
    /// Unix millis
    pub created_at: i64,
}

/// Create shop payload
///
/// The opening range (`open_from`..=`open_until`, may wrap the week) with
/// shared hours is expanded into the seven-key map on create.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShopCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_number: Option<String>,
    pub timezone: String,
    #[validate(length(min = 1, message = "at least one table is required"))]
    pub tables: Vec<TableSpec>,
    /// Lowercase weekday names
    pub open_from: String,
    pub open_until: String,
    /// "HH:MM"
    pub opens_at: String,
    pub closes_at: String,
}

/// Update shop payload; absent fields keep their current value
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShopUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_number: Option<String>,
    pub timezone: Option<String>,
    pub open_days: Option<OpenDays>,
    pub daily_overrides: Option<BTreeMap<String, DailyOverride>>,
    /// Replacing the floor plan re-derives totals and clamps availability
    pub tables: Option<Vec<TableSpec>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_expansion_marks_inner_days_only() {
        let days = OpenDays::from_range(Weekday::Tue, Weekday::Thu, "09:00", "17:00");
        assert!(!days.monday.enabled);
        assert!(days.tuesday.enabled);
        assert!(days.wednesday.enabled);
        assert!(days.thursday.enabled);
        assert!(!days.friday.enabled);
        assert_eq!(days.wednesday.open, "09:00");
        assert_eq!(days.wednesday.close, "17:00");
    }

    #[test]
    fn range_expansion_wraps_the_week() {
        let days = OpenDays::from_range(Weekday::Fri, Weekday::Mon, "10:00", "22:00");
        assert!(days.friday.enabled);
        assert!(days.saturday.enabled);
        assert!(days.sunday.enabled);
        assert!(days.monday.enabled);
        assert!(!days.tuesday.enabled);
        assert!(!days.thursday.enabled);
    }

    #[test]
    fn totals_derive_from_floor_plan() {
        let tables = vec![
            TableSpec {
                table_number: 1,
                seats: 4,
            },
            TableSpec {
                table_number: 2,
                seats: 2,
            },
            TableSpec {
                table_number: 3,
                seats: 6,
            },
        ];
        assert_eq!(TableSpec::derive_totals(&tables), (12, 3));
        assert_eq!(TableSpec::derive_totals(&[]), (0, 0));
    }
}
