//! Watchlist API
//!
//! - GET /api/watchlist - Watched symbols with refreshed prices
//! - POST /api/watchlist - Watch a symbol; 400 if already watched

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::types::WatchlistItem;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddWatchRequest {
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub added_price: Option<Decimal>,
    #[serde(default)]
    pub alert_price: Option<Decimal>,
}

async fn list(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<Vec<WatchlistItem>>> {
    Ok(Json(state.watchlist.list(&user_id).await?))
}

async fn add(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<AddWatchRequest>,
) -> Result<(StatusCode, Json<WatchlistItem>)> {
    if request.symbol.trim().is_empty() {
        return Err(AppError::BadRequest("stock_symbol is required".to_string()));
    }
    let item = state
        .watchlist
        .add(
            &user_id,
            &request.symbol,
            request.company_name,
            request.added_price,
            request.alert_price,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/watchlist", get(list).post(add))
}
