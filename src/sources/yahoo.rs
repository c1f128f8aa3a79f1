//! Yahoo Finance API client.
//!
//! Uses the unofficial chart endpoint for last prices and display names, and
//! the search endpoint for symbol lookup. No key required.

use super::{ProviderQuote, QuoteProvider, SearchProvider, SourceError, USER_AGENT};
use crate::types::SymbolMatch;
use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const YAHOO_SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";

/// Yahoo Finance chart response.
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<Decimal>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchResponse {
    #[serde(default)]
    quotes: Vec<YahooSearchQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "exchDisp")]
    exchange_display: Option<String>,
}

/// Normalize symbol for Yahoo Finance API.
/// Yahoo uses hyphens instead of dots for share classes (e.g., BRK-B not BRK.B)
fn normalize_yahoo_symbol(symbol: &str) -> String {
    symbol.to_uppercase().replace('.', "-")
}

fn meta_to_quote(meta: YahooMeta) -> ProviderQuote {
    let name = meta
        .long_name
        .or(meta.short_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    ProviderQuote {
        price: meta.regular_market_price.map(|p| p.normalize()),
        name,
    }
}

/// Equities and ETFs only; indices, futures and currencies are dropped.
fn search_quote_to_match(quote: YahooSearchQuote) -> Option<SymbolMatch> {
    let quote_type = quote.quote_type.as_deref().unwrap_or("");
    if quote_type != "EQUITY" && quote_type != "ETF" {
        return None;
    }
    let symbol = quote.symbol.filter(|s| !s.trim().is_empty())?;
    let name = quote.longname.or(quote.shortname).unwrap_or_else(|| symbol.clone());
    let exchange = quote.exchange_display.or(quote.exchange).unwrap_or_default();
    Some(SymbolMatch::new(&symbol, &name, &exchange))
}

/// Yahoo Finance API client.
pub struct YahooFinanceClient {
    client: Client,
    chart_url: String,
    search_url: String,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            chart_url: YAHOO_CHART_URL.to_string(),
            search_url: YAHOO_SEARCH_URL.to_string(),
        })
    }

    /// Point the client at a different host. Paths are appended as on Yahoo.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.chart_url = format!("{}/v8/finance/chart", base);
        self.search_url = format!("{}/v1/finance/search", base);
        self
    }

    /// Chart URL for a symbol, which becomes a single percent-encoded path segment.
    fn chart_url_for(&self, symbol: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.chart_url).map_err(|e| SourceError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Parse(format!("cannot-be-a-base URL: {}", self.chart_url)))?
            .pop_if_empty()
            .push(&normalize_yahoo_symbol(symbol));
        Ok(url)
    }

    /// Fetch the regular market price and company name for a symbol.
    pub async fn get_quote(&self, symbol: &str) -> Result<ProviderQuote, SourceError> {
        let url = self.chart_url_for(symbol)?;

        debug!("Fetching Yahoo Finance quote: {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if let Some(error) = data.chart.error {
            return Err(SourceError::Parse(format!("{} - {}", error.code, error.description)));
        }

        let result = data
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::NoData(symbol.to_string()))?;

        Ok(meta_to_quote(result.meta))
    }

    /// Search equities and ETFs.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, SourceError> {
        debug!("Searching Yahoo Finance for {}", query);

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("quotesCount", "10"), ("newsCount", "0")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let data: YahooSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(data.quotes.into_iter().filter_map(search_quote_to_match).collect())
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn supplies_names(&self) -> bool {
        true
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, SourceError> {
        self.get_quote(symbol).await
    }
}

#[async_trait]
impl SearchProvider for YahooFinanceClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, SourceError> {
        self.search_symbols(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_yahoo_symbol() {
        assert_eq!(normalize_yahoo_symbol("aapl"), "AAPL");
        assert_eq!(normalize_yahoo_symbol("BRK.B"), "BRK-B");
        assert_eq!(normalize_yahoo_symbol("BRK-B"), "BRK-B");
    }

    #[test]
    fn test_chart_url_encodes_symbol_as_one_segment() {
        let client = YahooFinanceClient::new(Duration::from_secs(1)).unwrap();
        let url = client.chart_url_for("brk.b").unwrap();
        assert_eq!(url.as_str(), "https://query1.finance.yahoo.com/v8/finance/chart/BRK-B");

        let url = client.chart_url_for("a/b?x#y").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/A%2FB%3FX%23Y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_chart_url_with_trailing_slash_base() {
        let client = YahooFinanceClient::new(Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        assert_eq!(client.chart_url_for("msft").unwrap().as_str(), "http://127.0.0.1:9/v8/finance/chart/MSFT");
    }

    #[test]
    fn test_chart_meta_parsing() {
        let json = r#"{"chart": {"result": [{"meta": {"symbol": "AAPL", "regularMarketPrice": 189.84,
            "longName": "Apple Inc.", "shortName": "Apple"}}], "error": null}}"#;
        let data: YahooChartResponse = serde_json::from_str(json).unwrap();
        let meta = data.chart.result.unwrap().into_iter().next().unwrap().meta;
        let quote = meta_to_quote(meta);
        assert_eq!(quote.price, Some(dec!(189.84)));
        assert_eq!(quote.name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_chart_meta_short_name_fallback() {
        let json = r#"{"regularMarketPrice": 10, "shortName": "Short Co"}"#;
        let meta: YahooMeta = serde_json::from_str(json).unwrap();
        let quote = meta_to_quote(meta);
        assert_eq!(quote.name.as_deref(), Some("Short Co"));
    }

    #[test]
    fn test_chart_meta_missing_price() {
        let json = r#"{"longName": "No Price Inc."}"#;
        let meta: YahooMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta_to_quote(meta).price, None);
    }

    #[test]
    fn test_search_filters_quote_types() {
        let json = r#"{"quotes": [
            {"symbol": "SPY", "shortname": "SPDR S&P 500", "quoteType": "ETF", "exchange": "PCX", "exchDisp": "NYSEArca"},
            {"symbol": "^GSPC", "shortname": "S&P 500", "quoteType": "INDEX", "exchange": "SNP"},
            {"symbol": "aapl", "longname": "Apple Inc.", "quoteType": "EQUITY", "exchange": "NMS"}
        ]}"#;
        let data: YahooSearchResponse = serde_json::from_str(json).unwrap();
        let matches: Vec<_> = data.quotes.into_iter().filter_map(search_quote_to_match).collect();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].symbol, "SPY");
        assert_eq!(matches[0].exchange, "NYSEArca");
        assert_eq!(matches[1].symbol, "AAPL");
        assert_eq!(matches[1].name, "Apple Inc.");
    }
}
