//! Forecast API
//!
//! - GET /api/ai/forecast?symbol=AAPL - Deterministic placeholder forecast

use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;

use crate::services::fallback_forecast;
use crate::types::Forecast;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    #[serde(default)]
    pub symbol: String,
}

async fn forecast(Query(query): Query<ForecastQuery>) -> Json<Forecast> {
    Json(fallback_forecast(&query.symbol))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/ai/forecast", get(forecast))
}
