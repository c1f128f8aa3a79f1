//! Goals API
//!
//! - GET /api/goals/progress - Progress of a savings goal from its amounts

use axum::{extract::Query, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::types::GoalProgress;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    pub target_amount: Option<String>,
    pub current_amount: Option<String>,
}

fn amount(raw: Option<&str>, field: &str) -> Result<Decimal> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))?;
    let value = Decimal::from_str(raw).map_err(|_| AppError::BadRequest(format!("{} must be a number", field)))?;
    if value.is_sign_negative() {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    Ok(value)
}

/// GET /api/goals/progress
async fn progress(Query(query): Query<ProgressQuery>) -> Result<Json<GoalProgress>> {
    let target = amount(query.target_amount.as_deref(), "target_amount")?;
    let current = match query.current_amount.as_deref() {
        None => Decimal::ZERO,
        raw => amount(raw, "current_amount")?,
    };
    Ok(Json(GoalProgress::new(target, current)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/goals/progress", get(progress))
}
