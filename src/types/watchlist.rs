//! Watchlist types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A symbol a user is watching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    pub company_name: String,
    pub added_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub alert_price: Option<Decimal>,
    #[serde(rename = "created_date")]
    pub created_at: DateTime<Utc>,
}

impl WatchlistItem {
    pub fn new(user_id: &str, symbol: &str, company_name: &str, added_price: Option<Decimal>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: symbol.trim().to_uppercase(),
            company_name: company_name.to_string(),
            added_price,
            current_price: added_price,
            alert_price: None,
            created_at: Utc::now(),
        }
    }
}
