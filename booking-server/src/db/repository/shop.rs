//! Shop Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::capacity;
use crate::db::models::{Shop, ShopUpdate, TableSpec};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "shop";

#[derive(Clone, Debug)]
pub struct ShopRepository {
    base: BaseRepository,
}

impl ShopRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all shops, name order
    pub async fn find_all(&self) -> RepoResult<Vec<Shop>> {
        let shops: Vec<Shop> = self
            .base
            .db()
            .query("SELECT * FROM shop ORDER BY name")
            .await?
            .take(0)?;
        Ok(shops)
    }

    /// Find shop by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Shop>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let shop: Option<Shop> = self.base.db().select(thing).await?;
        Ok(shop)
    }

    /// Find all shops owned by one account
    pub async fn find_by_owner(&self, owner_id: &str) -> RepoResult<Vec<Shop>> {
        let shops: Vec<Shop> = self
            .base
            .db()
            .query("SELECT * FROM shop WHERE owner_id = $owner ORDER BY name")
            .bind(("owner", owner_id.to_string()))
            .await?
            .take(0)?;
        Ok(shops)
    }

    async fn find_by_name_for_owner(
        &self,
        owner_id: &str,
        name: &str,
    ) -> RepoResult<Option<Shop>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM shop WHERE owner_id = $owner AND name = $name LIMIT 1")
            .bind(("owner", owner_id.to_string()))
            .bind(("name", name.to_string()))
            .await?;
        let shops: Vec<Shop> = result.take(0)?;
        Ok(shops.into_iter().next())
    }

    /// Persist a fully built shop entity.
    ///
    /// 实体组装 (营业日展开, 总量推导, created_at) 在调用方完成,
    /// repository 层只负责落库和重名检查。
    pub async fn create(&self, shop: Shop) -> RepoResult<Shop> {
        if self
            .find_by_name_for_owner(&shop.owner_id, &shop.name)
            .await?
            .is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Shop '{}' already exists for this owner",
                shop.name
            )));
        }

        let created: Option<Shop> = self.base.db().create(TABLE).content(shop).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create shop".to_string()))
    }

    /// Update shop profile and schedule.
    ///
    /// Replacing the floor plan re-derives the totals and shifts the
    /// availability by the same amount, clamped back into [0, total].
    pub async fn update(&self, id: &str, data: ShopUpdate) -> RepoResult<Shop> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Shop {} not found", id)))?;

        if let Some(new_name) = data.name.as_ref()
            && *new_name != existing.name
            && self
                .find_by_name_for_owner(&existing.owner_id, new_name)
                .await?
                .is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Shop '{}' already exists for this owner",
                new_name
            )));
        }

        let name = data.name.unwrap_or(existing.name);
        let address = data.address.or(existing.address);
        let contact_number = data.contact_number.or(existing.contact_number);
        let timezone = data.timezone.unwrap_or(existing.timezone);
        let open_days = data.open_days.unwrap_or(existing.open_days);
        let daily_overrides = data.daily_overrides.unwrap_or(existing.daily_overrides);

        let (tables, total_seats, total_tables, available_seats, available_tables) =
            match data.tables {
                Some(tables) => {
                    let (new_seats, new_tables) = TableSpec::derive_totals(&tables);
                    let seats = (existing.available_seats + (new_seats - existing.total_seats))
                        .clamp(0, new_seats);
                    let tbls = (existing.available_tables
                        + (new_tables - existing.total_tables))
                        .clamp(0, new_tables);
                    (tables, new_seats, new_tables, seats, tbls)
                }
                None => (
                    existing.tables,
                    existing.total_seats,
                    existing.total_tables,
                    existing.available_seats,
                    existing.available_tables,
                ),
            };

        // 手动构建 UPDATE 语句, 避免嵌套结构被序列化为字符串
        self.base
            .db()
            .query(
                "UPDATE $thing SET name = $name, address = $address, \
                 contact_number = $contact_number, timezone = $timezone, \
                 open_days = $open_days, daily_overrides = $daily_overrides, \
                 tables = $tables, total_seats = $total_seats, total_tables = $total_tables, \
                 available_seats = $available_seats, available_tables = $available_tables",
            )
            .bind(("thing", thing))
            .bind(("name", name))
            .bind(("address", address))
            .bind(("contact_number", contact_number))
            .bind(("timezone", timezone))
            .bind(("open_days", open_days))
            .bind(("daily_overrides", daily_overrides))
            .bind(("tables", tables))
            .bind(("total_seats", total_seats))
            .bind(("total_tables", total_tables))
            .bind(("available_seats", available_seats))
            .bind(("available_tables", available_tables))
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Shop {} not found", id)))
    }

    /// Apply an owner-side capacity adjustment, clamped into [0, total],
    /// and persist the result.
    pub async fn apply_capacity_delta(
        &self,
        id: &str,
        seat_delta: i64,
        table_delta: i64,
    ) -> RepoResult<Shop> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let mut shop = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Shop {} not found", id)))?;

        capacity::apply_delta(&mut shop, seat_delta, table_delta);

        self.base
            .db()
            .query("UPDATE $thing SET available_seats = $seats, available_tables = $tables")
            .bind(("thing", thing))
            .bind(("seats", shop.available_seats))
            .bind(("tables", shop.available_tables))
            .await?;

        Ok(shop)
    }
}
