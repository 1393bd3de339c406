//! Reservation API Handlers
//!
//! 业务规则都在 [`ReservationService`](crate::reservations::ReservationService)
//! 内执行, 这里只做身份提取和参数搬运。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Reservation, ReservationCreate};
use crate::utils::AppResult;

/// POST /api/reservations - 客户发起预订
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<Json<Reservation>> {
    let created = state
        .reservations
        .create_reservation(&user.user_id, payload)
        .await?;
    Ok(Json(created))
}

/// GET /api/reservations/mine - 客户名下未归档的预订 (新的在前)
pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Reservation>>> {
    let list = state.reservations.list_for_customer(&user.user_id).await?;
    Ok(Json(list))
}

/// GET /api/reservations/backlog - 店主名下所有店铺的预订待办
pub async fn backlog(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Reservation>>> {
    user.require_owner()?;
    let list = state
        .reservations
        .list_backlog_for_owner(&user.user_id)
        .await?;
    Ok(Json(list))
}

/// GET /api/reservations/:id - 单条预订 (本人或店主可见)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let resv = state.reservations.get_reservation(&id, &user.user_id).await?;
    Ok(Json(resv))
}

/// 接受请求体; 空对象 `{}` 即可, 备注可选
#[derive(Debug, Default, Deserialize)]
pub struct AcceptRequest {
    pub notes: Option<String>,
}

/// POST /api/reservations/:id/accept - 店主接受预订
///
/// 扣减容量、占用一张桌并按最小桌号完成初次分配, 整体原子。
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AcceptRequest>,
) -> AppResult<Json<Reservation>> {
    let resv = state
        .reservations
        .accept_reservation(&id, &user.user_id, payload.notes)
        .await?;
    Ok(Json(resv))
}

/// POST /api/reservations/:id/reject - 店主拒绝预订
pub async fn reject(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let resv = state
        .reservations
        .reject_reservation(&id, &user.user_id)
        .await?;
    Ok(Json(resv))
}

/// POST /api/reservations/:id/cancel - 取消预订
///
/// 店主随时可取消; 客户只能在创建后的宽限窗口内取消。
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let resv = state
        .reservations
        .cancel_reservation(&id, &user.user_id)
        .await?;
    Ok(Json(resv))
}

/// 换桌请求体
#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    pub table_number: Option<i64>,
    pub seat_number: Option<i64>,
}

/// POST /api/reservations/:id/assign - 重排桌位
///
/// 两个编号都给是手动指定 (允许店主有意拼桌);
/// 都不给则按最小桌号重新自动分配。
pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<Reservation>> {
    let resv = state
        .reservations
        .assign_seat_table(&id, &user.user_id, payload.table_number, payload.seat_number)
        .await?;
    Ok(Json(resv))
}

/// POST /api/reservations/:id/done - 标记履约完成
///
/// 不触碰容量; 桌位释放发生在取消或拒绝时。
pub async fn done(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let resv = state.reservations.mark_done(&id, &user.user_id).await?;
    Ok(Json(resv))
}

/// POST /api/reservations/:id/archive - 店主归档终态预订
pub async fn archive(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let resv = state
        .reservations
        .archive_reservation(&id, &user.user_id)
        .await?;
    Ok(Json(resv))
}
