use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
mod password;
pub mod repo;
pub mod resolver;
pub mod token;

pub use resolver::CurrentUser;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
