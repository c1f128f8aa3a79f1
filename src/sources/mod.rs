//! External market data sources.
//!
//! Every live source implements [`QuoteProvider`] and/or [`SearchProvider`] so
//! the quote and search services can walk them as an ordered fallback chain.
//! [`fallback`] holds the deterministic last-resort data used when none of
//! them answer.

pub mod alphavantage;
pub mod fallback;
pub mod stooq;
pub mod yahoo;

pub use alphavantage::AlphaVantageClient;
pub use stooq::StooqClient;
pub use yahoo::YahooFinanceClient;

use crate::types::SymbolMatch;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Browser user agent; Yahoo rejects the default reqwest agent.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Source errors. Always absorbed by the fallback chains.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data for {0}")]
    NoData(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// What a source knows about a symbol. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderQuote {
    pub price: Option<Decimal>,
    pub name: Option<String>,
}

impl ProviderQuote {
    pub fn price(price: Decimal) -> Self {
        Self {
            price: Some(price),
            name: None,
        }
    }

    /// Price if it is usable for trading (strictly positive).
    pub fn usable_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }
}

/// A live quote source.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the source can fill in company display names.
    fn supplies_names(&self) -> bool {
        false
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, SourceError>;
}

/// A live symbol search source.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_usable_price_rejects_non_positive() {
        assert_eq!(ProviderQuote::price(dec!(10)).usable_price(), Some(dec!(10)));
        assert_eq!(ProviderQuote::price(dec!(0)).usable_price(), None);
        assert_eq!(ProviderQuote::price(dec!(-1)).usable_price(), None);
        assert_eq!(ProviderQuote::default().usable_price(), None);
    }
}
