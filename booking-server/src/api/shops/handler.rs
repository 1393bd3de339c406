//! Shop API Handlers

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{DailyOverride, OpenDays, Shop, ShopCreate, ShopUpdate, TableSpec};
use crate::db::repository::ShopRepository;
use crate::reservations::ShopStatusView;
use crate::utils::time::{parse_hhmm, parse_timezone, to_millis, weekday_from_name};
use crate::utils::{AppError, AppResult};

const RESOURCE: &str = "shop";

/// GET /api/shops - 获取所有店铺
pub async fn list(
    State(state): State<ServerState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Shop>>> {
    let repo = ShopRepository::new(state.db.clone());
    let shops = repo.find_all().await?;
    Ok(Json(shops))
}

/// GET /api/shops/mine - 当前店主名下的店铺
pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Shop>>> {
    let repo = ShopRepository::new(state.db.clone());
    let shops = repo.find_by_owner(&user.user_id).await?;
    Ok(Json(shops))
}

/// GET /api/shops/:id - 获取单个店铺
pub async fn get_by_id(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Shop>> {
    let repo = ShopRepository::new(state.db.clone());
    let shop = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Shop {} not found", id)))?;
    Ok(Json(shop))
}

/// POST /api/shops - 创建店铺
///
/// 请求体描述营业区间与桌位清单, 总容量由清单推导, 可用量从满容量起步。
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ShopCreate>,
) -> AppResult<Json<Shop>> {
    user.require_owner()?;
    payload.validate()?;

    let entity = build_shop(&user.user_id, payload, to_millis(state.clock.now()))?;

    let repo = ShopRepository::new(state.db.clone());
    let shop = repo.create(entity).await?;

    // 广播同步通知
    let id = shop.id.as_ref().map(|t| t.to_string()).unwrap_or_default();
    state.notifier.notify(RESOURCE, "created", &id, Some(&shop));

    Ok(Json(shop))
}

/// PUT /api/shops/:id - 更新店铺
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ShopUpdate>,
) -> AppResult<Json<Shop>> {
    payload.validate()?;

    let repo = ShopRepository::new(state.db.clone());
    require_owned_shop(&repo, &id, &user).await?;
    if let Some(tables) = &payload.tables {
        check_floor_plan(tables)?;
    }
    if let Some(overrides) = &payload.daily_overrides {
        check_overrides(overrides)?;
    }

    let shop = repo.update(&id, payload).await?;

    // 广播同步通知
    state.notifier.notify(RESOURCE, "updated", &id, Some(&shop));

    Ok(Json(shop))
}

/// 状态查询参数
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// RFC3339 时刻, 缺省为当前时间
    pub at: Option<DateTime<Utc>>,
}

/// GET /api/shops/:id/status - 某时刻的营业与容量状态
pub async fn status(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<ShopStatusView>> {
    let view = state.reservations.get_shop_status(&id, query.at).await?;
    Ok(Json(view))
}

/// 手动容量修正 (正负增量)
#[derive(Debug, Deserialize)]
pub struct CapacityDeltaRequest {
    #[serde(default)]
    pub seats_delta: i64,
    #[serde(default)]
    pub tables_delta: i64,
}

/// POST /api/shops/:id/capacity - 店主手动修正可用容量
///
/// 结果被夹在 [0, total] 之内, 永不越界。
pub async fn adjust_capacity(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CapacityDeltaRequest>,
) -> AppResult<Json<Shop>> {
    let repo = ShopRepository::new(state.db.clone());
    require_owned_shop(&repo, &id, &user).await?;

    let shop = repo
        .apply_capacity_delta(&id, payload.seats_delta, payload.tables_delta)
        .await?;

    // 广播同步通知
    state.notifier.notify(RESOURCE, "capacity_adjusted", &id, Some(&shop));

    Ok(Json(shop))
}

/// 店铺级写操作的前置检查: 店铺存在且属于当前调用方
async fn require_owned_shop(
    repo: &ShopRepository,
    id: &str,
    user: &CurrentUser,
) -> AppResult<Shop> {
    let shop = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Shop {} not found", id)))?;
    if shop.owner_id != user.user_id {
        return Err(AppError::forbidden("Not your shop"));
    }
    Ok(shop)
}

/// 把创建负载装配成完整实体; 任何解析失败都在落库前拒绝
fn build_shop(owner_id: &str, payload: ShopCreate, created_at: i64) -> AppResult<Shop> {
    parse_timezone(&payload.timezone)?;

    let first = weekday_from_name(&payload.open_from)
        .ok_or_else(|| AppError::validation(format!("Unknown weekday '{}'", payload.open_from)))?;
    let last = weekday_from_name(&payload.open_until)
        .ok_or_else(|| AppError::validation(format!("Unknown weekday '{}'", payload.open_until)))?;
    for hhmm in [&payload.opens_at, &payload.closes_at] {
        if parse_hhmm(hhmm).is_none() {
            return Err(AppError::validation(format!(
                "Invalid time '{}', expected HH:MM",
                hhmm
            )));
        }
    }
    check_floor_plan(&payload.tables)?;

    let (total_seats, total_tables) = TableSpec::derive_totals(&payload.tables);
    let open_days = OpenDays::from_range(first, last, &payload.opens_at, &payload.closes_at);

    Ok(Shop {
        id: None,
        owner_id: owner_id.to_string(),
        name: payload.name,
        address: payload.address,
        contact_number: payload.contact_number,
        timezone: payload.timezone,
        total_seats,
        total_tables,
        available_seats: total_seats,
        available_tables: total_tables,
        open_days,
        daily_overrides: BTreeMap::new(),
        tables: payload.tables,
        created_at,
    })
}

/// 单日覆盖的结构检查: 日期键是 YYYY-MM-DD, 时间是 HH:MM
///
/// 运行期解析对坏数据一律按歇业处理, 这里只是提前把明显的错挡在写入前。
fn check_overrides(overrides: &BTreeMap<String, DailyOverride>) -> AppResult<()> {
    for (date, o) in overrides {
        if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(AppError::validation(format!(
                "Invalid override date '{}', expected YYYY-MM-DD",
                date
            )));
        }
        for hhmm in [o.open.as_deref(), o.close.as_deref()].into_iter().flatten() {
            if parse_hhmm(hhmm).is_none() {
                return Err(AppError::validation(format!(
                    "Invalid time '{}', expected HH:MM",
                    hhmm
                )));
            }
        }
    }
    Ok(())
}

/// 桌位清单的结构检查: 编号与座位数从 1 起, 编号不可重复
fn check_floor_plan(tables: &[TableSpec]) -> AppResult<()> {
    let mut seen = BTreeSet::new();
    for table in tables {
        if table.table_number < 1 || table.seats < 1 {
            return Err(AppError::validation(
                "Table numbers and seat counts start at 1",
            ));
        }
        if !seen.insert(table.table_number) {
            return Err(AppError::validation(format!(
                "Duplicate table number {}",
                table.table_number
            )));
        }
    }
    Ok(())
}
