//! End-to-end reservation lifecycle against an embedded database.
//! Run: cargo test -p booking-server --test reservation_flow

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};

use booking_server::auth::HeaderIdentity;
use booking_server::core::{Config, ServerState};
use booking_server::db::models::{
    OpenDays, Reservation, ReservationCreate, ReservationStatus, Shop, TableSpec,
};
use booking_server::db::repository::ShopRepository;
use booking_server::utils::time::to_millis;
use booking_server::utils::{Clock, ManualClock};
use booking_server::AppError;

/// Monday, 10:00 UTC
fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

async fn test_state(clock: Arc<ManualClock>) -> (ServerState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(tmp.path().to_string_lossy().to_string(), 0);
    let state = ServerState::initialize_with(&config, clock, Arc::new(HeaderIdentity)).await;
    (state, tmp)
}

fn shop_entity(
    owner_id: &str,
    name: &str,
    tables: Vec<TableSpec>,
    open: &str,
    close: &str,
    now: DateTime<Utc>,
) -> Shop {
    let (total_seats, total_tables) = TableSpec::derive_totals(&tables);
    Shop {
        id: None,
        owner_id: owner_id.into(),
        name: name.into(),
        address: None,
        contact_number: None,
        timezone: "UTC".into(),
        total_seats,
        total_tables,
        available_seats: total_seats,
        available_tables: total_tables,
        open_days: OpenDays::from_range(Weekday::Mon, Weekday::Sun, open, close),
        daily_overrides: BTreeMap::new(),
        tables,
        created_at: to_millis(now),
    }
}

fn two_tables() -> Vec<TableSpec> {
    vec![
        TableSpec {
            table_number: 1,
            seats: 4,
        },
        TableSpec {
            table_number: 2,
            seats: 2,
        },
    ]
}

fn booking(shop_id: &str, seats: i64, at: DateTime<Utc>) -> ReservationCreate {
    ReservationCreate {
        shop_id: shop_id.into(),
        seats_requested: seats,
        reservation_at: Some(at),
        weekday: None,
        time: None,
        message: None,
    }
}

fn id_of(resv: &Reservation) -> String {
    resv.id.as_ref().unwrap().to_string()
}

#[tokio::test]
async fn full_lifecycle_create_accept_done() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Uno", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(2)))
        .await
        .unwrap();
    assert_eq!(resv.status, ReservationStatus::Pending);
    assert!(resv.table_number.is_none());

    // 接受: 扣容量 + 最小桌号分配
    let resv_id = id_of(&resv);
    let accepted = state
        .reservations
        .accept_reservation(&resv_id, "user:li", Some("window side".into()))
        .await
        .unwrap();
    assert_eq!(accepted.status, ReservationStatus::Accepted);
    assert_eq!(accepted.table_number, Some(1));
    assert_eq!(accepted.seat_number, Some(1));
    assert_eq!(accepted.notes.as_deref(), Some("window side"));

    let after = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(after.available_seats, 4);
    assert_eq!(after.available_tables, 1);

    // 完成: 状态走终态, 容量保持不变
    let done = state
        .reservations
        .mark_done(&resv_id, "user:li")
        .await
        .unwrap();
    assert_eq!(done.status, ReservationStatus::Done);

    let after_done = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(after_done.available_seats, 4);
    assert_eq!(after_done.available_tables, 1);
}

#[tokio::test]
async fn accept_rejects_when_capacity_is_gone() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let one_table = vec![TableSpec {
        table_number: 1,
        seats: 2,
    }];
    let shop = shops
        .create(shop_entity("user:li", "Tiny Bar", one_table, "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let slot = now + Duration::hours(2);
    let first = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, slot))
        .await
        .unwrap();
    let second = state
        .reservations
        .create_reservation("user:bob", booking(&shop_id, 2, slot))
        .await
        .unwrap();

    state
        .reservations
        .accept_reservation(&id_of(&first), "user:li", None)
        .await
        .unwrap();

    let err = state
        .reservations
        .accept_reservation(&id_of(&second), "user:li", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoCapacity(_)), "got {err:?}");

    // 容量不会被失败的接受扣到负数
    let after = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(after.available_seats, 0);
    assert_eq!(after.available_tables, 0);
}

#[tokio::test]
async fn cancelling_an_accepted_reservation_restores_capacity() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Dos", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 3, now + Duration::hours(1)))
        .await
        .unwrap();
    let resv_id = id_of(&resv);

    state
        .reservations
        .accept_reservation(&resv_id, "user:li", None)
        .await
        .unwrap();
    let held = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(held.available_seats, 3);
    assert_eq!(held.available_tables, 1);

    // 店主取消不受时间窗限制, 归还容量并清空桌位
    let cancelled = state
        .reservations
        .cancel_reservation(&resv_id, "user:li")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Deleted);
    assert!(cancelled.table_number.is_none());
    assert!(cancelled.seat_number.is_none());

    let restored = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(restored.available_seats, 6);
    assert_eq!(restored.available_tables, 2);
}

#[tokio::test]
async fn cancelling_a_pending_reservation_leaves_capacity_alone() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Tres", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(1)))
        .await
        .unwrap();

    let cancelled = state
        .reservations
        .cancel_reservation(&id_of(&resv), "user:amy")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Deleted);

    let after = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(after.available_seats, 6);
    assert_eq!(after.available_tables, 2);
}

#[tokio::test]
async fn customer_cancel_window_is_enforced() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock.clone()).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Cuatro", two_tables(), "00:00", "23:59", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(5)))
        .await
        .unwrap();
    let resv_id = id_of(&resv);

    // 窗口过后客户不能再自助取消
    clock.advance(Duration::minutes(25));
    let err = state
        .reservations
        .cancel_reservation(&resv_id, "user:amy")
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::CancellationWindowExpired { .. }),
        "got {err:?}"
    );

    // 其他人更不行
    let err = state
        .reservations
        .cancel_reservation(&resv_id, "user:mallory")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 店主仍然可以
    let cancelled = state
        .reservations
        .cancel_reservation(&resv_id, "user:li")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Deleted);
}

#[tokio::test]
async fn terminal_states_refuse_further_transitions() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Cinco", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(2)))
        .await
        .unwrap();
    let resv_id = id_of(&resv);

    state
        .reservations
        .accept_reservation(&resv_id, "user:li", None)
        .await
        .unwrap();
    state
        .reservations
        .mark_done(&resv_id, "user:li")
        .await
        .unwrap();

    let err = state
        .reservations
        .accept_reservation(&resv_id, "user:li", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err:?}");

    // 已完成的单子容量早已结清, 二次操作不改变水位
    let after = shops.find_by_id(&shop_id).await.unwrap().unwrap();
    assert_eq!(after.available_seats, 4);
}

#[tokio::test]
async fn creation_is_gated_by_opening_hours() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Seis", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    // 17:00 含端点, 18:00 越界
    let err = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(8)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfHours(_)), "got {err:?}");

    let at_close = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(7)))
        .await
        .unwrap();
    assert_eq!(at_close.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn weekday_shorthand_books_the_next_occurrence() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Siete", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let req = ReservationCreate {
        shop_id: shop_id.clone(),
        seats_requested: 2,
        reservation_at: None,
        weekday: Some("friday".into()),
        time: Some("10:00".into()),
        message: None,
    };
    let resv = state
        .reservations
        .create_reservation("user:amy", req)
        .await
        .unwrap();

    let expected = Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap();
    assert_eq!(resv.reservation_at, to_millis(expected));
}

#[tokio::test]
async fn seat_assignment_manual_and_automatic() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Ocho", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();
    let slot = now + Duration::hours(2);

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, slot))
        .await
        .unwrap();
    let resv_id = id_of(&resv);
    state
        .reservations
        .accept_reservation(&resv_id, "user:li", None)
        .await
        .unwrap();

    // 手动指定不做冲突检查 (店主可以有意拼桌)
    let moved = state
        .reservations
        .assign_seat_table(&resv_id, "user:li", Some(2), Some(1))
        .await
        .unwrap();
    assert_eq!(moved.table_number, Some(2));
    assert_eq!(moved.seat_number, Some(1));

    // 自动重排: 跳过其他已接受预订占用的桌
    let other = state
        .reservations
        .create_reservation("user:bob", booking(&shop_id, 2, slot))
        .await
        .unwrap();
    state
        .reservations
        .accept_reservation(&id_of(&other), "user:li", None)
        .await
        .unwrap();

    let auto = state
        .reservations
        .assign_seat_table(&resv_id, "user:li", None, None)
        .await
        .unwrap();
    assert_eq!(auto.table_number, Some(2));
    let other_now = state
        .reservations
        .get_reservation(&id_of(&other), "user:li")
        .await
        .unwrap();
    assert_eq!(other_now.table_number, Some(1));

    // 只给一半是参数错误
    let err = state
        .reservations
        .assign_seat_table(&resv_id, "user:li", Some(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn owner_backlog_spans_many_shops() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock.clone()).await;

    let shops = ShopRepository::new(state.db.clone());

    // 12 家店触发分片查询 (单批上限 10)
    for i in 0..12 {
        let shop = shops
            .create(shop_entity(
                "user:li",
                &format!("Branch {i:02}"),
                two_tables(),
                "00:00",
                "23:59",
                clock.now(),
            ))
            .await
            .unwrap();
        let shop_id = shop.id.as_ref().unwrap().to_string();
        state
            .reservations
            .create_reservation("user:amy", booking(&shop_id, 2, clock.now() + Duration::hours(3)))
            .await
            .unwrap();
        clock.advance(Duration::minutes(1));
    }

    // 别人的店不会混进来
    let foreign = shops
        .create(shop_entity("user:wu", "Not Yours", two_tables(), "00:00", "23:59", clock.now()))
        .await
        .unwrap();
    state
        .reservations
        .create_reservation(
            "user:amy",
            booking(&foreign.id.as_ref().unwrap().to_string(), 2, clock.now() + Duration::hours(3)),
        )
        .await
        .unwrap();

    let backlog = state
        .reservations
        .list_backlog_for_owner("user:li")
        .await
        .unwrap();
    assert_eq!(backlog.len(), 12);

    // 新的在前
    let times: Vec<i64> = backlog.iter().map(|r| r.created_at).collect();
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(times, sorted);
}

#[tokio::test]
async fn archive_hides_terminal_reservations_from_lists() {
    let now = monday_morning();
    let clock = ManualClock::starting_at(now);
    let (state, _tmp) = test_state(clock).await;

    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .create(shop_entity("user:li", "Cafe Nueve", two_tables(), "09:00", "17:00", now))
        .await
        .unwrap();
    let shop_id = shop.id.as_ref().unwrap().to_string();

    let resv = state
        .reservations
        .create_reservation("user:amy", booking(&shop_id, 2, now + Duration::hours(2)))
        .await
        .unwrap();
    let resv_id = id_of(&resv);

    // 活跃预订不能归档
    let err = state
        .reservations
        .archive_reservation(&resv_id, "user:li")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    state
        .reservations
        .reject_reservation(&resv_id, "user:li")
        .await
        .unwrap();
    state
        .reservations
        .archive_reservation(&resv_id, "user:li")
        .await
        .unwrap();

    assert!(state
        .reservations
        .list_for_customer("user:amy")
        .await
        .unwrap()
        .is_empty());
    assert!(state
        .reservations
        .list_backlog_for_owner("user:li")
        .await
        .unwrap()
        .is_empty());
}
