use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sermons",
            get(handlers::list_sermons).post(handlers::create_sermon),
        )
        .route(
            "/sermons/:id",
            patch(handlers::update_sermon).delete(handlers::delete_sermon),
        )
        .route("/sermons/suggest-themes", post(handlers::suggest_themes))
        .route("/sermons/generate-full", post(handlers::generate_full))
        .route("/sermons/generate", post(handlers::generate_outline))
}
