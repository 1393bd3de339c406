//! Reservation Repository
//!
//! List queries plus the guarded SurrealQL transactions that keep a
//! status write and its capacity effect atomic (预约状态与容量的原子写入).

use super::{BaseRepository, RepoError, RepoResult, classify_transaction_error};
use crate::db::models::{Reservation, ReservationStatus};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "reservation";

/// Embedded SurrealDB misbehaves on wide `IN` filters; owner backlogs
/// across many shops are sharded at this size and merged in memory.
pub const SHARD_LIMIT: usize = 10;

/// pending -> accepted, decrementing shop capacity in the same transaction.
/// Both guards THROW tokens that `classify_transaction_error` maps to
/// `RepoError::Conflict` for the caller's retry loop.
const ACCEPT_TX: &str = "\
BEGIN TRANSACTION; \
IF $resv.status != 'pending' { THROW 'reservation_state_changed' }; \
IF $shop.available_seats < $seats OR $shop.available_tables < 1 { THROW 'capacity_exhausted' }; \
UPDATE $shop SET available_seats = available_seats - $seats, available_tables = available_tables - 1; \
UPDATE $resv SET status = 'accepted', table_number = $table_number, seat_number = $seat_number, notes = $notes; \
COMMIT TRANSACTION;";

/// accepted -> deleted | rejected, restoring capacity clamped to the totals.
const RELEASE_TX: &str = "\
BEGIN TRANSACTION; \
IF $resv.status != 'accepted' { THROW 'reservation_state_changed' }; \
UPDATE $shop SET \
available_seats = math::min([available_seats + $seats, total_seats]), \
available_tables = math::min([available_tables + 1, total_tables]); \
UPDATE $resv SET status = $status, table_number = NONE, seat_number = NONE; \
COMMIT TRANSACTION;";

/// pending -> deleted | rejected. Capacity was never reserved, so only the
/// status guard is needed.
const SETTLE_TX: &str = "\
BEGIN TRANSACTION; \
IF $resv.status != 'pending' { THROW 'reservation_state_changed' }; \
UPDATE $resv SET status = $status; \
COMMIT TRANSACTION;";

/// accepted -> done. Completion never touches capacity.
const FINISH_TX: &str = "\
BEGIN TRANSACTION; \
IF $resv.status != 'accepted' { THROW 'reservation_state_changed' }; \
UPDATE $resv SET status = 'done'; \
COMMIT TRANSACTION;";

/// Re-point the seat assignment of an accepted reservation.
const ASSIGN_TX: &str = "\
BEGIN TRANSACTION; \
IF $resv.status != 'accepted' { THROW 'reservation_state_changed' }; \
UPDATE $resv SET table_number = $table_number, seat_number = $seat_number; \
COMMIT TRANSACTION;";

#[derive(Clone, Debug)]
pub struct ReservationRepository {
    base: BaseRepository,
}

impl ReservationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn parse_id(id: &str) -> RepoResult<RecordId> {
        id.parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))
    }

    /// Find reservation by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Reservation>> {
        let thing = Self::parse_id(id)?;
        let reservation: Option<Reservation> = self.base.db().select(thing).await?;
        Ok(reservation)
    }

    /// Persist a fully built reservation entity (assembled by the service)
    pub async fn create(&self, reservation: Reservation) -> RepoResult<Reservation> {
        let created: Option<Reservation> =
            self.base.db().create(TABLE).content(reservation).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create reservation".to_string()))
    }

    /// Customer's own reservations, newest first, hiding archived rows
    pub async fn find_for_customer(&self, customer_id: &str) -> RepoResult<Vec<Reservation>> {
        let reservations: Vec<Reservation> = self
            .base
            .db()
            .query(
                "SELECT * FROM reservation \
                 WHERE customer_id = $customer AND archived = false \
                 ORDER BY created_at DESC",
            )
            .bind(("customer", customer_id.to_string()))
            .await?
            .take(0)?;
        Ok(reservations)
    }

    /// Backlog across a set of shops, newest first.
    ///
    /// 店铺集合按 SHARD_LIMIT 分片查询再合并, 规避嵌入式引擎的
    /// IN 过滤问题。
    pub async fn find_by_shops(&self, shop_ids: &[String]) -> RepoResult<Vec<Reservation>> {
        let mut merged: Vec<Reservation> = Vec::new();
        for chunk in shop_ids.chunks(SHARD_LIMIT) {
            let shard: Vec<Reservation> = self
                .base
                .db()
                .query(
                    "SELECT * FROM reservation \
                     WHERE shop_id IN $ids AND archived = false \
                     ORDER BY created_at DESC",
                )
                .bind(("ids", chunk.to_vec()))
                .await?
                .take(0)?;
            merged.extend(shard);
        }
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(merged)
    }

    /// Accepted reservations holding the same shop+slot; the allocator
    /// treats their table/seat pairs as taken.
    pub async fn find_accepted_in_slot(
        &self,
        shop_id: &str,
        reservation_at: i64,
    ) -> RepoResult<Vec<Reservation>> {
        let reservations: Vec<Reservation> = self
            .base
            .db()
            .query(
                "SELECT * FROM reservation \
                 WHERE shop_id = $shop AND reservation_at = $at AND status = 'accepted'",
            )
            .bind(("shop", shop_id.to_string()))
            .bind(("at", reservation_at))
            .await?
            .take(0)?;
        Ok(reservations)
    }

    /// Surface THROW guards as `Conflict`, then re-read the row so callers
    /// get the committed state instead of the transaction echo.
    async fn checked_reread(
        &self,
        id: &str,
        response: surrealdb::Response,
    ) -> RepoResult<Reservation> {
        response.check().map_err(classify_transaction_error)?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Accept a pending reservation, taking `seats` + 1 table from the shop
    /// in the same transaction. Fails with `Conflict` if the status moved
    /// or the capacity ran out underneath the caller.
    pub async fn accept_pending(
        &self,
        id: &str,
        shop_id: &str,
        seats: i64,
        table_number: i64,
        seat_number: i64,
        notes: Option<String>,
    ) -> RepoResult<Reservation> {
        let resv = Self::parse_id(id)?;
        let shop = Self::parse_id(shop_id)?;
        let response = self
            .base
            .db()
            .query(ACCEPT_TX)
            .bind(("resv", resv))
            .bind(("shop", shop))
            .bind(("seats", seats))
            .bind(("table_number", table_number))
            .bind(("seat_number", seat_number))
            .bind(("notes", notes))
            .await?;
        self.checked_reread(id, response).await
    }

    /// Move an accepted reservation to `deleted` or `rejected`, giving its
    /// seats and table back to the shop (clamped to the totals).
    pub async fn release_accepted(
        &self,
        id: &str,
        shop_id: &str,
        seats: i64,
        status: ReservationStatus,
    ) -> RepoResult<Reservation> {
        let resv = Self::parse_id(id)?;
        let shop = Self::parse_id(shop_id)?;
        let response = self
            .base
            .db()
            .query(RELEASE_TX)
            .bind(("resv", resv))
            .bind(("shop", shop))
            .bind(("seats", seats))
            .bind(("status", status.as_str()))
            .await?;
        self.checked_reread(id, response).await
    }

    /// Move a pending reservation to `deleted` or `rejected` (no capacity
    /// was held yet)
    pub async fn settle_pending(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> RepoResult<Reservation> {
        let resv = Self::parse_id(id)?;
        let response = self
            .base
            .db()
            .query(SETTLE_TX)
            .bind(("resv", resv))
            .bind(("status", status.as_str()))
            .await?;
        self.checked_reread(id, response).await
    }

    /// accepted -> done
    pub async fn finish_accepted(&self, id: &str) -> RepoResult<Reservation> {
        let resv = Self::parse_id(id)?;
        let response = self.base.db().query(FINISH_TX).bind(("resv", resv)).await?;
        self.checked_reread(id, response).await
    }

    /// Overwrite the table/seat assignment of an accepted reservation
    pub async fn set_assignment(
        &self,
        id: &str,
        table_number: i64,
        seat_number: i64,
    ) -> RepoResult<Reservation> {
        let resv = Self::parse_id(id)?;
        let response = self
            .base
            .db()
            .query(ASSIGN_TX)
            .bind(("resv", resv))
            .bind(("table_number", table_number))
            .bind(("seat_number", seat_number))
            .await?;
        self.checked_reread(id, response).await
    }

    /// Hide or unhide a reservation from list queries
    pub async fn set_archived(&self, id: &str, archived: bool) -> RepoResult<Reservation> {
        let thing = Self::parse_id(id)?;
        self.base
            .db()
            .query("UPDATE $thing SET archived = $archived")
            .bind(("thing", thing))
            .bind(("archived", archived))
            .await?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Hard-delete terminal reservations of one status created before the
    /// cutoff (Unix millis). Returns how many rows went away. The archived
    /// flag is deliberately ignored here.
    pub async fn purge_terminal(
        &self,
        status: ReservationStatus,
        cutoff_ms: i64,
    ) -> RepoResult<usize> {
        let mut response = self
            .base
            .db()
            .query(
                "DELETE reservation \
                 WHERE status = $status AND created_at < $cutoff \
                 RETURN BEFORE",
            )
            .bind(("status", status.as_str()))
            .bind(("cutoff", cutoff_ms))
            .await?;
        let deleted: Vec<serde_json::Value> = response.take(0)?;
        Ok(deleted.len())
    }
}
