mod dto;
pub mod handlers;
pub mod likes;
pub mod moderation;
pub mod repo;
pub mod similar;
#[cfg(test)]
pub(crate) mod testutil;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_router())
        .merge(handlers::user_router())
        .merge(handlers::admin_router())
}
