use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod identity;
pub mod password;
pub mod services;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::account_routes())
}
