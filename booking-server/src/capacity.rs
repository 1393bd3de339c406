//! Capacity Tracker
//!
//! 座位/餐桌可用量计数与压力指示。可用量永远被夹在 [0, total] 区间内,
//! 越界按策略收敛而不是报错 (并发修改下计数竞争是合法情形)。

use serde::Serialize;

use crate::db::models::Shop;

/// Capacity pressure indicator shown next to a shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityBand {
    Ok,
    Warning,
    Critical,
}

/// Band for an available/total pair. Exhausted availability is critical,
/// and so is a zero total (nothing can ever be offered). A quarter or
/// less remaining is warning.
pub fn capacity_band(available: i64, total: i64) -> CapacityBand {
    if total <= 0 || available <= 0 {
        return CapacityBand::Critical;
    }
    if (available as f64) / (total as f64) <= 0.25 {
        CapacityBand::Warning
    } else {
        CapacityBand::Ok
    }
}

/// Shift a shop's availability counters by the given deltas, clamped
/// into [0, total].
pub fn apply_delta(shop: &mut Shop, seats_delta: i64, tables_delta: i64) {
    shop.available_seats = (shop.available_seats + seats_delta).clamp(0, shop.total_seats.max(0));
    shop.available_tables =
        (shop.available_tables + tables_delta).clamp(0, shop.total_tables.max(0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::OpenDays;
    use rand::Rng;

    fn shop(available: i64, total: i64) -> Shop {
        Shop {
            id: None,
            owner_id: "user:owner".to_string(),
            name: "Band Cafe".to_string(),
            address: None,
            contact_number: None,
            timezone: "UTC".to_string(),
            total_seats: total,
            total_tables: 3,
            available_seats: available,
            available_tables: 3,
            open_days: OpenDays::default(),
            daily_overrides: Default::default(),
            tables: vec![],
            created_at: 0,
        }
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(capacity_band(0, 10), CapacityBand::Critical);
        assert_eq!(capacity_band(5, 0), CapacityBand::Critical);
        // exactly a quarter is warning, just above is ok
        assert_eq!(capacity_band(1, 4), CapacityBand::Warning);
        assert_eq!(capacity_band(26, 100), CapacityBand::Ok);
        assert_eq!(capacity_band(25, 100), CapacityBand::Warning);
        assert_eq!(capacity_band(10, 10), CapacityBand::Ok);
    }

    #[test]
    fn deltas_clamp_to_bounds() {
        let mut s = shop(2, 10);
        apply_delta(&mut s, -5, 0);
        assert_eq!(s.available_seats, 0);

        let mut s = shop(9, 10);
        apply_delta(&mut s, 5, 1);
        assert_eq!(s.available_seats, 10);
        assert_eq!(s.available_tables, 3);
    }

    #[test]
    fn random_delta_sequences_never_escape_bounds() {
        let mut rng = rand::thread_rng();
        let mut s = shop(10, 10);
        for _ in 0..1000 {
            let seats: i64 = rng.gen_range(-6..=6);
            let tables: i64 = rng.gen_range(-2..=2);
            apply_delta(&mut s, seats, tables);
            assert!(s.available_seats >= 0 && s.available_seats <= s.total_seats);
            assert!(s.available_tables >= 0 && s.available_tables <= s.total_tables);
        }
    }
}
