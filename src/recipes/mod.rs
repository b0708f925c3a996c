use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod filter;
pub mod handlers;
pub mod repo;
pub mod shopping_list;

pub fn router() -> Router<AppState> {
    handlers::recipe_routes()
}
