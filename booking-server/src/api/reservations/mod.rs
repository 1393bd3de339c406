//! Reservation API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reservations", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/mine", get(handler::list_mine))
        .route("/backlog", get(handler::backlog))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/reject", post(handler::reject))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/assign", post(handler::assign))
        .route("/{id}/done", post(handler::done))
        .route("/{id}/archive", post(handler::archive))
}
