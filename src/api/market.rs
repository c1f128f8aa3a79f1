//! Market data API
//!
//! - GET /api/market/quote?symbol=AAPL&fresh=1 - Resolve a spot quote
//! - GET /api/market/search?q=apple - Symbol search (at most 10 matches)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::types::{Quote, SymbolMatch};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    pub symbol: Option<String>,
    /// `1` or `true` bypasses the quote cache
    pub fresh: Option<String>,
}

impl QuoteQuery {
    pub fn force_fresh(&self) -> bool {
        matches!(self.fresh.as_deref(), Some("1") | Some("true"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/market/quote
async fn get_quote(State(state): State<AppState>, Query(query): Query<QuoteQuery>) -> Result<Json<Quote>> {
    let symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("symbol is required".to_string()))?;

    Ok(Json(state.quotes.resolve(symbol, query.force_fresh()).await))
}

/// GET /api/market/search
async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Json<Vec<SymbolMatch>> {
    Json(state.search.search(&query.q).await)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/market/quote", get(get_quote))
        .route("/api/market/search", get(search))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_query_parsing() {
        let query: QuoteQuery = serde_urlencoded::from_str("symbol=aapl&fresh=1").unwrap();
        assert_eq!(query.symbol.as_deref(), Some("aapl"));
        assert!(query.force_fresh());

        let query: QuoteQuery = serde_urlencoded::from_str("symbol=aapl&fresh=0").unwrap();
        assert!(!query.force_fresh());

        let query: QuoteQuery = serde_urlencoded::from_str("").unwrap();
        assert!(query.symbol.is_none());
        assert!(!query.force_fresh());
    }

    #[test]
    fn test_search_query_default() {
        let query: SearchQuery = serde_urlencoded::from_str("").unwrap();
        assert_eq!(query.q, "");
    }
}
