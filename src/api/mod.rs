pub mod ai;
pub mod auth;
pub mod goals;
pub mod health;
pub mod market;
pub mod portfolio;
pub mod trading;
pub mod watchlist;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(trading::router())
        .merge(portfolio::router())
        .merge(market::router())
        .merge(ai::router())
        .merge(watchlist::router())
        .merge(goals::router())
}
