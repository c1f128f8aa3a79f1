//! Trading API
//!
//! - POST /api/trades - Execute a buy or sell
//! - GET /api/trades - Trade history, newest first
//! - POST /api/account - Open the caller's account (idempotent)
//! - GET /api/account - Cash balance and cumulative invested

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use super::auth::CurrentUser;
use crate::services::TradingError;
use crate::types::{Account, Trade, TradeRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for TradingError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            TradingError::InvalidOrder(_) => (StatusCode::BAD_REQUEST, "INVALID_ORDER"),
            TradingError::InsufficientBalance { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE"),
            TradingError::InsufficientShares { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_SHARES"),
            TradingError::NoPosition(_) => (StatusCode::NOT_FOUND, "NO_POSITION"),
            TradingError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            TradingError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

/// POST /api/trades
async fn place_trade(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(mut request): Json<TradeRequest>,
) -> Result<(StatusCode, Json<Trade>), TradingError> {
    request.user_id = user_id;
    let trade = state.trading.execute(request).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

/// GET /api/trades
async fn list_trades(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Trade>>, TradingError> {
    Ok(Json(state.trading.trades(&user_id)?))
}

/// POST /api/account
async fn open_account(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Account>, TradingError> {
    Ok(Json(state.trading.open_account(&user_id).await?))
}

/// GET /api/account
async fn get_account(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Account>, TradingError> {
    Ok(Json(state.trading.account(&user_id)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/trades", post(place_trade).get(list_trades))
        .route("/api/account", post(open_account).get(get_account))
}
