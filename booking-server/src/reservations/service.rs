//! Reservation Service
//!
//! 预约生命周期的编排层: 创建时用营业时间把关, 状态转换走转移表 +
//! 数据库原子事务, 竞争冲突做有界重试, 成功后广播通知。

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use validator::Validate;

use crate::capacity::{self, CapacityBand};
use crate::core::Config;
use crate::db::models::{Reservation, ReservationCreate, ReservationStatus, Shop};
use crate::db::repository::{ReservationRepository, ShopRepository};
use crate::notify::Notifier;
use crate::reservations::allocator;
use crate::reservations::machine::{self, Action, CapacityEffect};
use crate::schedule::{active_override, next_occurrence, resolve_status};
use crate::utils::time::{from_millis, parse_hhmm, parse_timezone, to_millis, weekday_from_name};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult, SharedClock};

/// Base delay between transaction retries (exponential backoff)
const RETRY_BASE_DELAY_MS: u64 = 50;

const RESOURCE: &str = "reservation";

/// Snapshot view for shop browsing. Counts are eventually consistent;
/// only the transactional write path is authoritative.
#[derive(Debug, Clone, Serialize)]
pub struct ShopStatusView {
    pub shop_id: String,
    pub at: DateTime<Utc>,
    pub is_open: bool,
    /// "HH:MM", absent when no rule applies to the local date
    pub effective_open: Option<String>,
    pub effective_close: Option<String>,
    pub capacity_band: CapacityBand,
    pub total_seats: i64,
    pub available_seats: i64,
    pub total_tables: i64,
    pub available_tables: i64,
}

#[derive(Clone, Debug)]
pub struct ReservationService {
    shops: ShopRepository,
    reservations: ReservationRepository,
    notifier: Notifier,
    clock: SharedClock,
    cancel_window: Duration,
    tx_max_retries: u32,
}

impl ReservationService {
    pub fn new(db: Surreal<Db>, notifier: Notifier, clock: SharedClock, config: &Config) -> Self {
        Self {
            shops: ShopRepository::new(db.clone()),
            reservations: ReservationRepository::new(db),
            notifier,
            clock,
            cancel_window: config.cancel_window(),
            tx_max_retries: config.tx_max_retries,
        }
    }

    /// Create a pending reservation, gated by the shop's schedule.
    ///
    /// Capacity is not touched here; it is committed only when the owner
    /// accepts.
    pub async fn create_reservation(
        &self,
        customer_id: &str,
        req: ReservationCreate,
    ) -> AppResult<Reservation> {
        req.validate()?;

        let shop = self
            .shops
            .find_by_id(&req.shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shop {} not found", req.shop_id)))?;

        if req.seats_requested > shop.total_seats {
            return Err(AppError::validation(format!(
                "Requested {} seats but the shop only has {}",
                req.seats_requested, shop.total_seats
            )));
        }

        let at = self.resolve_slot(&shop, &req)?;

        if !resolve_status(&shop, at).is_open {
            return Err(AppError::out_of_hours(at.to_rfc3339()));
        }

        let reservation = Reservation {
            id: None,
            shop_id: req.shop_id.clone(),
            customer_id: customer_id.to_string(),
            seats_requested: req.seats_requested,
            reservation_at: to_millis(at),
            message: req.message,
            status: ReservationStatus::Pending,
            table_number: None,
            seat_number: None,
            notes: None,
            archived: false,
            created_at: to_millis(self.clock.now()),
        };

        let created = self.reservations.create(reservation).await?;
        let id = record_id_string(&created.id);
        self.notifier.notify(RESOURCE, "created", &id, Some(&created));
        Ok(created)
    }

    /// The requested slot: an explicit instant, or a weekday+time pair
    /// seeded through the next-occurrence rule in the shop's timezone.
    fn resolve_slot(&self, shop: &Shop, req: &ReservationCreate) -> AppResult<DateTime<Utc>> {
        if let Some(at) = req.reservation_at {
            return Ok(at);
        }
        match (req.weekday.as_deref(), req.time.as_deref()) {
            (Some(day), Some(time)) => {
                let weekday = weekday_from_name(day)
                    .ok_or_else(|| AppError::validation(format!("Unknown weekday '{day}'")))?;
                let time = parse_hhmm(time).ok_or_else(|| {
                    AppError::validation(format!("Invalid time '{time}', expected HH:MM"))
                })?;
                let tz = parse_timezone(&shop.timezone)?;
                Ok(next_occurrence(weekday, time, tz, self.clock.now()))
            }
            _ => Err(AppError::validation(
                "Either reservation_at or weekday+time is required",
            )),
        }
    }

    pub async fn accept_reservation(
        &self,
        id: &str,
        owner_id: &str,
        notes: Option<String>,
    ) -> AppResult<Reservation> {
        validate_optional_text(&notes, "notes", MAX_NOTE_LEN)?;
        self.run_transition(id, owner_id, Action::Accept, notes).await
    }

    pub async fn reject_reservation(&self, id: &str, owner_id: &str) -> AppResult<Reservation> {
        self.run_transition(id, owner_id, Action::Reject, None).await
    }

    /// Owner withdrawal has no time limit; a customer may only cancel
    /// inside the grace window after creation.
    pub async fn cancel_reservation(&self, id: &str, actor_id: &str) -> AppResult<Reservation> {
        self.run_transition(id, actor_id, Action::Cancel, None).await
    }

    pub async fn mark_done(&self, id: &str, owner_id: &str) -> AppResult<Reservation> {
        self.run_transition(id, owner_id, Action::MarkDone, None).await
    }

    /// Run one lifecycle action with bounded optimistic retry.
    ///
    /// Guard failures inside the transaction (status moved, capacity taken
    /// underneath us) surface as `ConcurrencyConflict` and are retried
    /// against fresh state, so permanent refusals (illegal transition,
    /// no capacity) keep their own error kinds instead of looping.
    async fn run_transition(
        &self,
        id: &str,
        actor_id: &str,
        action: Action,
        notes: Option<String>,
    ) -> AppResult<Reservation> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..self.tx_max_retries {
            match self
                .transition_once(id, actor_id, action, notes.clone())
                .await
            {
                Ok(updated) => {
                    self.notifier
                        .notify(RESOURCE, notice_action(action), id, Some(&updated));
                    return Ok(updated);
                }
                Err(AppError::ConcurrencyConflict(msg)) => {
                    tracing::warn!(
                        reservation = %id,
                        action = %action,
                        attempt = attempt + 1,
                        "Transition raced, retrying"
                    );
                    last_err = Some(AppError::ConcurrencyConflict(msg));
                    if attempt + 1 < self.tx_max_retries {
                        let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::conflict("Transition retries exhausted")))
    }

    async fn transition_once(
        &self,
        id: &str,
        actor_id: &str,
        action: Action,
        notes: Option<String>,
    ) -> AppResult<Reservation> {
        let resv = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reservation {} not found", id)))?;
        let shop = self
            .shops
            .find_by_id(&resv.shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shop {} not found", resv.shop_id)))?;

        self.authorize(action, actor_id, &resv, &shop)?;

        let (next, effect) = machine::transition(resv.status, action)?;

        let updated = match effect {
            CapacityEffect::Reserve => {
                if shop.available_seats < resv.seats_requested || shop.available_tables < 1 {
                    return Err(AppError::no_capacity(format!(
                        "{} seat(s) requested, {} seat(s) and {} table(s) left",
                        resv.seats_requested, shop.available_seats, shop.available_tables
                    )));
                }
                let others = self
                    .reservations
                    .find_accepted_in_slot(&resv.shop_id, resv.reservation_at)
                    .await?;
                let slot = allocator::assign(&shop, resv.seats_requested, &others)?;
                self.reservations
                    .accept_pending(
                        id,
                        &resv.shop_id,
                        resv.seats_requested,
                        slot.table_number,
                        slot.seat_number,
                        notes,
                    )
                    .await?
            }
            CapacityEffect::Release => {
                self.reservations
                    .release_accepted(id, &resv.shop_id, resv.seats_requested, next)
                    .await?
            }
            CapacityEffect::None => match resv.status {
                ReservationStatus::Pending => self.reservations.settle_pending(id, next).await?,
                _ => self.reservations.finish_accepted(id).await?,
            },
        };

        Ok(updated)
    }

    /// Accept/reject/done are owner actions. Cancel is open to the owner
    /// unconditionally and to the reservation's customer inside the grace
    /// window (the transition table itself stays time-free).
    fn authorize(
        &self,
        action: Action,
        actor_id: &str,
        resv: &Reservation,
        shop: &Shop,
    ) -> AppResult<()> {
        match action {
            Action::Accept | Action::Reject | Action::MarkDone => {
                if shop.owner_id != actor_id {
                    return Err(AppError::forbidden(
                        "Only the shop owner can handle reservations",
                    ));
                }
                Ok(())
            }
            Action::Cancel => {
                if shop.owner_id == actor_id {
                    return Ok(());
                }
                if resv.customer_id != actor_id {
                    return Err(AppError::forbidden("Not your reservation"));
                }
                let created = from_millis(resv.created_at)
                    .ok_or_else(|| AppError::internal("Reservation carries a corrupt created_at"))?;
                let elapsed = self.clock.now() - created;
                if elapsed > self.cancel_window {
                    return Err(AppError::CancellationWindowExpired {
                        elapsed_minutes: elapsed.num_minutes(),
                        window_minutes: self.cancel_window.num_minutes(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Re-point the seat/table of an accepted reservation.
    ///
    /// Both numbers given: manual override without a conflict scan (the
    /// owner may double-book deliberately). Neither given: deterministic
    /// re-allocation against the slot's other accepted reservations.
    pub async fn assign_seat_table(
        &self,
        id: &str,
        owner_id: &str,
        table_number: Option<i64>,
        seat_number: Option<i64>,
    ) -> AppResult<Reservation> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..self.tx_max_retries {
            match self
                .assign_once(id, owner_id, table_number, seat_number)
                .await
            {
                Ok(updated) => {
                    self.notifier.notify(RESOURCE, "assigned", id, Some(&updated));
                    return Ok(updated);
                }
                Err(AppError::ConcurrencyConflict(msg)) => {
                    tracing::warn!(
                        reservation = %id,
                        attempt = attempt + 1,
                        "Assignment raced, retrying"
                    );
                    last_err = Some(AppError::ConcurrencyConflict(msg));
                    if attempt + 1 < self.tx_max_retries {
                        let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::conflict("Assignment retries exhausted")))
    }

    async fn assign_once(
        &self,
        id: &str,
        owner_id: &str,
        table_number: Option<i64>,
        seat_number: Option<i64>,
    ) -> AppResult<Reservation> {
        let resv = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reservation {} not found", id)))?;
        let shop = self
            .shops
            .find_by_id(&resv.shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shop {} not found", resv.shop_id)))?;

        if shop.owner_id != owner_id {
            return Err(AppError::forbidden("Only the shop owner can assign seats"));
        }
        if resv.status != ReservationStatus::Accepted {
            return Err(AppError::validation(
                "Seat assignment requires an accepted reservation",
            ));
        }

        let (table, seat) = match (table_number, seat_number) {
            (Some(t), Some(s)) => (t, s),
            (None, None) => {
                let others: Vec<Reservation> = self
                    .reservations
                    .find_accepted_in_slot(&resv.shop_id, resv.reservation_at)
                    .await?
                    .into_iter()
                    .filter(|r| r.id != resv.id)
                    .collect();
                let slot = allocator::assign(&shop, resv.seats_requested, &others)?;
                (slot.table_number, slot.seat_number)
            }
            _ => {
                return Err(AppError::validation(
                    "table_number and seat_number must be provided together",
                ));
            }
        };

        Ok(self.reservations.set_assignment(id, table, seat).await?)
    }

    /// Open/closed plus capacity pressure for one instant (default "now").
    ///
    /// A daily override carrying its own seat count replaces the stored
    /// availability in this view only; the write path never reads it.
    pub async fn get_shop_status(
        &self,
        shop_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<ShopStatusView> {
        let shop = self
            .shops
            .find_by_id(shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shop {} not found", shop_id)))?;
        let at = at.unwrap_or_else(|| self.clock.now());

        let resolved = resolve_status(&shop, at);
        let available_seats = active_override(&shop, at)
            .and_then(|o| o.available_seats)
            .map(|v| v.clamp(0, shop.total_seats.max(0)))
            .unwrap_or(shop.available_seats);

        Ok(ShopStatusView {
            shop_id: record_id_string(&shop.id),
            at,
            is_open: resolved.is_open,
            effective_open: resolved
                .effective_open
                .map(|t| t.format("%H:%M").to_string()),
            effective_close: resolved
                .effective_close
                .map(|t| t.format("%H:%M").to_string()),
            capacity_band: capacity::capacity_band(available_seats, shop.total_seats),
            total_seats: shop.total_seats,
            available_seats,
            total_tables: shop.total_tables,
            available_tables: shop.available_tables,
        })
    }

    /// Hard-delete terminal reservations older than the window.
    ///
    /// The archived flag is ignored on purpose: age and status alone
    /// decide what goes away.
    pub async fn purge_terminal_reservations(
        &self,
        older_than: Duration,
        status: ReservationStatus,
    ) -> AppResult<usize> {
        if !status.is_terminal() {
            return Err(AppError::validation(format!(
                "Cannot purge active status '{status}'"
            )));
        }
        let cutoff = to_millis(self.clock.now() - older_than);
        let count = self.reservations.purge_terminal(status, cutoff).await?;
        if count > 0 {
            tracing::info!(status = %status, count, "Purged terminal reservations");
            self.notifier.notify(
                "purge",
                "completed",
                status.as_str(),
                Some(&serde_json::json!({ "count": count })),
            );
        }
        Ok(count)
    }

    /// Fetch one reservation, visible to its customer and the shop owner
    pub async fn get_reservation(&self, id: &str, actor_id: &str) -> AppResult<Reservation> {
        let resv = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reservation {} not found", id)))?;
        if resv.customer_id != actor_id {
            let shop = self
                .shops
                .find_by_id(&resv.shop_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Shop {} not found", resv.shop_id)))?;
            if shop.owner_id != actor_id {
                return Err(AppError::forbidden("Not your reservation"));
            }
        }
        Ok(resv)
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> AppResult<Vec<Reservation>> {
        Ok(self.reservations.find_for_customer(customer_id).await?)
    }

    /// Owner backlog across every owned shop (sharded lookup underneath)
    pub async fn list_backlog_for_owner(&self, owner_id: &str) -> AppResult<Vec<Reservation>> {
        let shops = self.shops.find_by_owner(owner_id).await?;
        let ids: Vec<String> = shops
            .iter()
            .filter_map(|s| s.id.as_ref().map(|id| id.to_string()))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.reservations.find_by_shops(&ids).await?)
    }

    /// Hide a terminal reservation from list queries. Purge still sees it.
    pub async fn archive_reservation(&self, id: &str, owner_id: &str) -> AppResult<Reservation> {
        let resv = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reservation {} not found", id)))?;
        let shop = self
            .shops
            .find_by_id(&resv.shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shop {} not found", resv.shop_id)))?;
        if shop.owner_id != owner_id {
            return Err(AppError::forbidden(
                "Only the shop owner can archive reservations",
            ));
        }
        if !resv.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Cannot archive a reservation still in '{}'",
                resv.status
            )));
        }
        let updated = self.reservations.set_archived(id, true).await?;
        self.notifier.notify(RESOURCE, "archived", id, Some(&updated));
        Ok(updated)
    }
}

fn record_id_string(id: &Option<surrealdb::RecordId>) -> String {
    id.as_ref().map(|r| r.to_string()).unwrap_or_default()
}

fn notice_action(action: Action) -> &'static str {
    match action {
        Action::Accept => "accepted",
        Action::Reject => "rejected",
        Action::Cancel => "cancelled",
        Action::MarkDone => "done",
    }
}
