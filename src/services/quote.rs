//! Quote resolution.
//!
//! Walks an ordered list of providers until one yields a usable price, fills
//! in a display name from a later name-capable provider when the winner had
//! none, and falls back to a deterministic synthetic price. Every result is
//! cached for the freshness window. Resolution never fails.

use super::Cache;
use crate::config::QuoteConfig;
use crate::sources::fallback::synthetic_price;
use crate::sources::{
    AlphaVantageClient, ProviderQuote, QuoteProvider, SourceError, StooqClient, YahooFinanceClient,
};
use crate::types::Quote;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cache key for a symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Resolves spot quotes through a provider chain.
pub struct QuoteService {
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: Cache<Quote>,
    timeout: Duration,
}

impl QuoteService {
    /// Create a service over the given providers, tried in order.
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>, cache_ttl: Duration, timeout: Duration) -> Self {
        Self {
            providers,
            cache: Cache::new(cache_ttl),
            timeout,
        }
    }

    /// Standard chain: Alpha Vantage (when keyed), Yahoo, Stooq.
    pub fn from_config(config: &QuoteConfig) -> Result<Self, SourceError> {
        let mut providers: Vec<Arc<dyn QuoteProvider>> = Vec::new();
        if let Some(key) = &config.alpha_vantage_api_key {
            providers.push(Arc::new(AlphaVantageClient::new(key.clone(), config.timeout())?));
        }
        providers.push(Arc::new(YahooFinanceClient::new(config.timeout())?));
        providers.push(Arc::new(StooqClient::new(config.csv_timeout())?));

        // The service bound must cover the slowest client
        let timeout = config.timeout().max(config.csv_timeout());
        Ok(Self::new(providers, config.cache_ttl(), timeout))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fresh cached quote, if any.
    pub fn cached(&self, symbol: &str) -> Option<Quote> {
        self.cache.get(&normalize_symbol(symbol))
    }

    /// Drop expired quotes from the cache, returning how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.cleanup()
    }

    /// Sweep the cache once per freshness window until the service is dropped.
    pub fn start_cache_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let every = self.cache.ttl().max(Duration::from_secs(1));
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(service) = weak.upgrade() else {
                    break;
                };
                let removed = service.sweep_cache();
                if removed > 0 {
                    debug!("Swept {} expired quotes", removed);
                }
            }
        })
    }

    /// Resolve a quote. `force_fresh` bypasses (but still refreshes) the cache.
    pub async fn resolve(&self, symbol: &str, force_fresh: bool) -> Quote {
        let symbol = normalize_symbol(symbol);

        if !force_fresh {
            if let Some(quote) = self.cache.get(&symbol) {
                debug!("Quote cache hit for {}", symbol);
                return quote;
            }
        }

        let quote = self.resolve_uncached(&symbol).await;
        self.cache.set(symbol, quote.clone());
        quote
    }

    /// Resolve several symbols concurrently, keyed by normalized symbol.
    pub async fn resolve_many<I, S>(&self, symbols: I) -> HashMap<String, Quote>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = symbols.into_iter().map(|s| normalize_symbol(s.as_ref())).collect();
        unique.sort();
        unique.dedup();

        let quotes = join_all(unique.iter().map(|symbol| self.resolve(symbol, false))).await;
        unique.into_iter().zip(quotes).collect()
    }

    async fn resolve_uncached(&self, symbol: &str) -> Quote {
        if symbol.is_empty() {
            return self.synthetic(symbol, None);
        }

        let mut name: Option<String> = None;
        let mut winner: Option<(usize, rust_decimal::Decimal)> = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            let Some(answer) = self.call(provider.as_ref(), symbol).await else {
                continue;
            };
            if name.is_none() {
                name = answer.name.clone();
            }
            if let Some(price) = answer.usable_price() {
                winner = Some((idx, price));
                break;
            }
            debug!("{} returned no usable price for {}", provider.name(), symbol);
        }

        let Some((idx, price)) = winner else {
            return self.synthetic(symbol, name);
        };

        if name.is_none() {
            for provider in self.providers[idx + 1..].iter().filter(|p| p.supplies_names()) {
                if let Some(found) = self.call(provider.as_ref(), symbol).await.and_then(|a| a.name) {
                    name = Some(found);
                    break;
                }
            }
        }

        Quote {
            company_name: name.unwrap_or_else(|| symbol.to_string()),
            symbol: symbol.to_string(),
            price,
            is_fallback: false,
        }
    }

    /// One bounded provider call. Failures are logged and swallowed.
    async fn call(&self, provider: &dyn QuoteProvider, symbol: &str) -> Option<ProviderQuote> {
        match tokio::time::timeout(self.timeout, provider.fetch_quote(symbol)).await {
            Ok(Ok(answer)) => Some(answer),
            Ok(Err(e)) => {
                debug!("{} failed for {}: {}", provider.name(), symbol, e);
                None
            }
            Err(_) => {
                debug!("{} timed out for {} after {:?}", provider.name(), symbol, self.timeout);
                None
            }
        }
    }

    fn synthetic(&self, symbol: &str, name: Option<String>) -> Quote {
        let price = synthetic_price(symbol);
        warn!("No live price for {:?}, using synthetic {}", symbol, price);
        Quote {
            company_name: name.unwrap_or_else(|| symbol.to_string()),
            symbol: symbol.to_string(),
            price,
            is_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct Fixed(Option<rust_decimal::Decimal>, Option<&'static str>);

    #[async_trait]
    impl QuoteProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn supplies_names(&self) -> bool {
            self.1.is_some()
        }

        async fn fetch_quote(&self, _symbol: &str) -> Result<ProviderQuote, SourceError> {
            Ok(ProviderQuote {
                price: self.0,
                name: self.1.map(String::from),
            })
        }
    }

    fn service(providers: Vec<Arc<dyn QuoteProvider>>) -> QuoteService {
        QuoteService::new(providers, Duration::from_secs(60), Duration::from_secs(1))
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl "), "AAPL");
    }

    #[tokio::test]
    async fn test_no_providers_uses_synthetic() {
        let quote = service(vec![]).resolve("aapl", false).await;
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.company_name, "AAPL");
        assert_eq!(quote.price, dec!(172.86));
        assert!(quote.is_fallback);
    }

    #[tokio::test]
    async fn test_first_price_wins() {
        let svc = service(vec![
            Arc::new(Fixed(Some(dec!(101)), None)),
            Arc::new(Fixed(Some(dec!(202)), Some("Later Name"))),
        ]);
        let quote = svc.resolve("X", false).await;
        assert_eq!(quote.price, dec!(101));
        assert_eq!(quote.company_name, "Later Name");
        assert!(!quote.is_fallback);
    }

    #[tokio::test]
    async fn test_zero_price_is_skipped() {
        let svc = service(vec![
            Arc::new(Fixed(Some(dec!(0)), Some("Zero Corp"))),
            Arc::new(Fixed(Some(dec!(5)), None)),
        ]);
        let quote = svc.resolve("Z", false).await;
        assert_eq!(quote.price, dec!(5));
        assert_eq!(quote.company_name, "Zero Corp");
    }

    #[tokio::test]
    async fn test_empty_symbol_is_synthetic() {
        let quote = service(vec![Arc::new(Fixed(Some(dec!(1)), None))]).resolve("  ", false).await;
        assert!(quote.is_fallback);
        assert_eq!(quote.price, dec!(228.68));
    }
}
