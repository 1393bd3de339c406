//! Shop API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/shops", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/mine", get(handler::list_mine))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .route("/{id}/status", get(handler::status))
        .route("/{id}/capacity", post(handler::adjust_capacity))
}
