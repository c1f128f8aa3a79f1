//! Alpha Vantage API client.
//!
//! Supplies last-trade prices (`GLOBAL_QUOTE`) and symbol search
//! (`SYMBOL_SEARCH`). Free tier is heavily rate limited (25 requests/day);
//! throttled responses carry a `Note` or `Information` field instead of data
//! and are reported as [`SourceError::NoData`].

use super::{ProviderQuote, QuoteProvider, SearchProvider, SourceError};
use crate::types::SymbolMatch;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage global quote response.
#[derive(Debug, Clone, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
}

/// Alpha Vantage symbol search response.
#[derive(Debug, Clone, Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches")]
    best_matches: Option<Vec<HashMap<String, String>>>,
}

/// Read the price out of a `Global Quote` object. Key casing varies.
fn parse_global_quote(quote: &HashMap<String, String>) -> Option<Decimal> {
    quote
        .get("05. price")
        .or_else(|| quote.get("05. Price"))
        .and_then(|raw| Decimal::from_str(raw.trim()).ok())
        .map(|price| price.normalize())
}

fn parse_best_match(entry: &HashMap<String, String>) -> Option<SymbolMatch> {
    let symbol = entry.get("1. symbol")?.trim();
    if symbol.is_empty() {
        return None;
    }
    let name = entry.get("2. name").map(|s| s.trim()).unwrap_or(symbol);
    let exchange = entry.get("4. region").map(|s| s.trim()).unwrap_or("");
    Some(SymbolMatch::new(symbol, name, exchange))
}

/// Alpha Vantage API client.
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with a per-request timeout.
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: ALPHA_VANTAGE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T, SourceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }

    /// Get the latest price for a symbol.
    pub async fn get_global_quote(&self, symbol: &str) -> Result<Decimal, SourceError> {
        debug!("Fetching Alpha Vantage quote for {}", symbol);

        let data: GlobalQuoteResponse = self.query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)]).await?;

        data.global_quote
            .as_ref()
            .and_then(parse_global_quote)
            .ok_or_else(|| SourceError::NoData(symbol.to_string()))
    }

    /// Search listings matching the keywords.
    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, SourceError> {
        debug!("Searching Alpha Vantage for {}", keywords);

        let data: SymbolSearchResponse = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", keywords)])
            .await?;

        let matches = data
            .best_matches
            .ok_or_else(|| SourceError::NoData(keywords.to_string()))?;

        Ok(matches.iter().filter_map(parse_best_match).collect())
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, SourceError> {
        self.get_global_quote(symbol).await.map(ProviderQuote::price)
    }
}

#[async_trait]
impl SearchProvider for AlphaVantageClient {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, SourceError> {
        self.search_symbols(query).await
    }
}
