//! Portfolio API
//!
//! - GET /api/portfolio - Open positions marked to current quotes
//! - GET /api/portfolio/summary - Totals, P&L and equity

use axum::{extract::State, routing::get, Json, Router};

use super::auth::CurrentUser;
use crate::services::TradingError;
use crate::types::{PortfolioSummary, Position};
use crate::AppState;

async fn list_positions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Position>>, TradingError> {
    Ok(Json(state.portfolio.positions(&user_id).await?))
}

async fn summary(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<PortfolioSummary>, TradingError> {
    Ok(Json(state.portfolio.summary(&user_id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/portfolio", get(list_positions))
        .route("/api/portfolio/summary", get(summary))
}
