//! Stooq CSV quote client.
//!
//! Last-resort live source. Returns a one-row CSV with a header line; the
//! close is the seventh column. US listings need a `.us` suffix.

use super::{ProviderQuote, QuoteProvider, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const STOOQ_URL: &str = "https://stooq.com/q/l/";

const CLOSE_COLUMN: usize = 6;

/// Stooq ticker: lowercase, with `.us` appended when no market suffix is given.
pub fn stooq_symbol(symbol: &str) -> String {
    let symbol = symbol.trim().to_lowercase();
    if symbol.contains('.') {
        symbol
    } else {
        format!("{}.us", symbol)
    }
}

/// Close price from the second CSV line. `N/D` and malformed rows yield `None`.
pub fn parse_close(csv: &str) -> Option<Decimal> {
    let row = csv.lines().nth(1)?;
    let raw = row.split(',').nth(CLOSE_COLUMN)?.trim();
    Decimal::from_str(raw).ok().filter(|price| *price > Decimal::ZERO)
}

/// Stooq client.
pub struct StooqClient {
    client: Client,
    base_url: String,
}

impl StooqClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: STOOQ_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the latest close for a symbol.
    pub async fn get_close(&self, symbol: &str) -> Result<Decimal, SourceError> {
        let ticker = stooq_symbol(symbol);
        debug!("Fetching Stooq quote for {}", ticker);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("s", ticker.as_str()), ("f", "sd2t2ohlcv"), ("h", ""), ("e", "csv")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_close(&body).ok_or_else(|| SourceError::NoData(symbol.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for StooqClient {
    fn name(&self) -> &'static str {
        "stooq"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, SourceError> {
        self.get_close(symbol).await.map(ProviderQuote::price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stooq_symbol() {
        assert_eq!(stooq_symbol("AAPL"), "aapl.us");
        assert_eq!(stooq_symbol("BRK.B"), "brk.b");
        assert_eq!(stooq_symbol("vod.uk"), "vod.uk");
    }

    #[test]
    fn test_parse_close() {
        let csv = "Symbol,Date,Time,Open,High,Low,Close,Volume\r\nAAPL.US,2024-05-01,22:00:09,169.58,172.71,169.11,169.3,50383147\r\n";
        assert_eq!(parse_close(csv), Some(dec!(169.3)));
    }

    #[test]
    fn test_parse_close_no_data() {
        let csv = "Symbol,Date,Time,Open,High,Low,Close,Volume\nZZZZ.US,N/D,N/D,N/D,N/D,N/D,N/D,N/D\n";
        assert_eq!(parse_close(csv), None);
    }

    #[test]
    fn test_parse_close_header_only() {
        assert_eq!(parse_close("Symbol,Date,Time,Open,High,Low,Close,Volume"), None);
        assert_eq!(parse_close(""), None);
    }
}
