//! Seat/Table Allocator
//!
//! Deterministic lowest-first assignment: the first table (by number)
//! that is free for the slot and big enough for the party, then the
//! first free seat at that table. Repeated runs over the same input
//! always produce the same answer.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::db::models::{Reservation, Shop, TableSpec};
use crate::utils::AppError;

#[derive(Debug, Error)]
#[error("no free table for {seats} seat(s) in this slot")]
pub struct NoCapacity {
    pub seats: i64,
}

impl From<NoCapacity> for AppError {
    fn from(err: NoCapacity) -> Self {
        AppError::NoCapacity(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub table_number: i64,
    pub seat_number: i64,
}

/// Pick a table and seat for `seats_requested`, avoiding tables held by
/// `others` (the accepted reservations sharing the shop and slot).
///
/// 店铺没有配置桌位列表时, 按总量合成一个每桌容量等于 total_seats 的
/// 平面桌位图。
pub fn assign(
    shop: &Shop,
    seats_requested: i64,
    others: &[Reservation],
) -> Result<Assignment, NoCapacity> {
    let used: BTreeSet<i64> = others.iter().filter_map(|r| r.table_number).collect();

    let mut plan: Vec<TableSpec> = if shop.tables.is_empty() {
        (1..=shop.total_tables)
            .map(|n| TableSpec {
                table_number: n,
                seats: shop.total_seats,
            })
            .collect()
    } else {
        shop.tables.clone()
    };
    plan.sort_by_key(|t| t.table_number);

    for table in &plan {
        if used.contains(&table.table_number) || table.seats < seats_requested {
            continue;
        }
        let taken: BTreeSet<i64> = others
            .iter()
            .filter(|r| r.table_number == Some(table.table_number))
            .filter_map(|r| r.seat_number)
            .collect();
        for seat in 1..=table.seats {
            if !taken.contains(&seat) {
                return Ok(Assignment {
                    table_number: table.table_number,
                    seat_number: seat,
                });
            }
        }
    }

    Err(NoCapacity {
        seats: seats_requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{OpenDays, ReservationStatus};

    fn test_shop(tables: Vec<TableSpec>) -> Shop {
        let (total_seats, total_tables) = TableSpec::derive_totals(&tables);
        Shop {
            id: None,
            owner_id: "user:owner".to_string(),
            name: "Alloc Bistro".to_string(),
            address: None,
            contact_number: None,
            timezone: "UTC".to_string(),
            total_seats,
            total_tables,
            available_seats: total_seats,
            available_tables: total_tables,
            open_days: OpenDays::default(),
            daily_overrides: Default::default(),
            tables,
            created_at: 0,
        }
    }

    fn accepted_at(table: i64, seat: i64) -> Reservation {
        Reservation {
            id: None,
            shop_id: "shop:alloc".to_string(),
            customer_id: "user:guest".to_string(),
            seats_requested: 2,
            reservation_at: 0,
            message: None,
            status: ReservationStatus::Accepted,
            table_number: Some(table),
            seat_number: Some(seat),
            notes: None,
            archived: false,
            created_at: 0,
        }
    }

    fn four_tables() -> Vec<TableSpec> {
        (1..=4)
            .map(|n| TableSpec {
                table_number: n,
                seats: 4,
            })
            .collect()
    }

    #[test]
    fn skips_used_tables_deterministically() {
        let shop = test_shop(four_tables());
        let others = vec![accepted_at(1, 1), accepted_at(2, 1)];
        for _ in 0..5 {
            let got = assign(&shop, 2, &others).unwrap();
            assert_eq!(
                got,
                Assignment {
                    table_number: 3,
                    seat_number: 1
                }
            );
        }
    }

    #[test]
    fn skips_tables_too_small_for_the_party() {
        let shop = test_shop(vec![
            TableSpec {
                table_number: 1,
                seats: 2,
            },
            TableSpec {
                table_number: 2,
                seats: 6,
            },
        ]);
        let got = assign(&shop, 4, &[]).unwrap();
        assert_eq!(got.table_number, 2);
    }

    #[test]
    fn fails_when_every_table_is_held() {
        let shop = test_shop(four_tables());
        let others: Vec<_> = (1..=4).map(|t| accepted_at(t, 1)).collect();
        let err = assign(&shop, 2, &others).unwrap_err();
        assert_eq!(err.seats, 2);
    }

    #[test]
    fn synthesizes_plan_from_totals_when_no_table_list() {
        let mut shop = test_shop(vec![]);
        shop.total_seats = 8;
        shop.total_tables = 2;
        let got = assign(&shop, 3, &[]).unwrap();
        assert_eq!(
            got,
            Assignment {
                table_number: 1,
                seat_number: 1
            }
        );
    }

    #[test]
    fn unsorted_plan_still_picks_lowest_number() {
        let shop = test_shop(vec![
            TableSpec {
                table_number: 7,
                seats: 4,
            },
            TableSpec {
                table_number: 3,
                seats: 4,
            },
        ]);
        let got = assign(&shop, 2, &[]).unwrap();
        assert_eq!(got.table_number, 3);
    }
}
