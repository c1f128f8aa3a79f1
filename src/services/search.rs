//! Symbol search across providers with a static fallback table.

use crate::config::QuoteConfig;
use crate::sources::fallback::match_well_known;
use crate::sources::{AlphaVantageClient, SearchProvider, SourceError, YahooFinanceClient};
use crate::types::SymbolMatch;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maximum number of matches returned.
pub const MAX_RESULTS: usize = 10;

/// Queries shorter than this (after trimming) return nothing.
pub const MIN_QUERY_LEN: usize = 2;

pub struct SymbolSearch {
    providers: Vec<Arc<dyn SearchProvider>>,
    timeout: Duration,
}

impl SymbolSearch {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Standard chain: Alpha Vantage (when keyed), then Yahoo.
    pub fn from_config(config: &QuoteConfig) -> Result<Self, SourceError> {
        let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
        if let Some(key) = &config.alpha_vantage_api_key {
            providers.push(Arc::new(AlphaVantageClient::new(key.clone(), config.timeout())?));
        }
        providers.push(Arc::new(YahooFinanceClient::new(config.timeout())?));
        Ok(Self::new(providers, config.timeout()))
    }

    /// Search listings. Never fails; at most [`MAX_RESULTS`] unique symbols.
    ///
    /// An empty answer moves on to the next provider. The static table is
    /// only consulted when no provider answered at all.
    pub async fn search(&self, query: &str) -> Vec<SymbolMatch> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let mut answered = false;
        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, provider.search(query)).await {
                Ok(Ok(matches)) if !matches.is_empty() => return dedupe(matches),
                Ok(Ok(_)) => {
                    answered = true;
                    debug!("{} found nothing for {:?}", provider.name(), query);
                }
                Ok(Err(e)) => debug!("{} search failed for {:?}: {}", provider.name(), query, e),
                Err(_) => debug!("{} search timed out for {:?}", provider.name(), query),
            }
        }

        if answered {
            Vec::new()
        } else {
            dedupe(match_well_known(query))
        }
    }
}

/// Drop repeated symbols, keeping first occurrence, and cap the list.
fn dedupe(matches: Vec<SymbolMatch>) -> Vec<SymbolMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.symbol.clone()))
        .take(MAX_RESULTS)
        .collect()
}
