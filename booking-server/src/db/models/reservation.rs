//! Reservation Model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

use super::serde_helpers;

/// Reservation lifecycle states (预约状态)
///
/// pending 是唯一的初始状态; rejected / done / deleted 为终止状态,
/// 不再接受任何转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Accepted,
    Rejected,
    Done,
    Deleted,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Accepted => "accepted",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Done => "done",
            ReservationStatus::Deleted => "deleted",
        }
    }

    /// Terminal states hold no capacity and accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Done | ReservationStatus::Deleted
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation entity (预约)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Stored as the full "shop:xxx" key string
    pub shop_id: String,
    pub customer_id: String,
    pub seats_requested: i64,
    /// Requested slot, Unix millis
    pub reservation_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: ReservationStatus,
    /// Set on accept (automatic allocation or manual override)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i64>,
    /// Owner-side notes attached on accept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Archived rows stay in storage but drop out of list queries
    #[serde(deserialize_with = "serde_helpers::bool_false", default)]
    pub archived: bool,
    /// Unix millis
    pub created_at: i64,
}

/// Create reservation payload
///
/// The slot is either an explicit `reservation_at` instant or a
/// weekday + "HH:MM" pair resolved to its next occurrence in the
/// shop's timezone.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReservationCreate {
    pub shop_id: String,
    #[validate(range(min = 1, message = "at least one seat must be requested"))]
    pub seats_requested: i64,
    pub reservation_at: Option<DateTime<Utc>>,
    /// Lowercase weekday name, e.g. "friday"
    pub weekday: Option<String>,
    /// "HH:MM"
    pub time: Option<String>,
    #[validate(length(max = 500))]
    pub message: Option<String>,
}
