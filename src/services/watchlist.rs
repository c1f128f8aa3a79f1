//! Watchlist pricing.
//!
//! Listing a watchlist resolves every watched symbol and returns the items
//! with current prices immediately. Changed prices are persisted by a
//! detached task; its failures are logged, never surfaced.

use super::quote::{normalize_symbol, QuoteService};
use super::store::{StoreError, WatchlistStore};
use crate::types::WatchlistItem;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("Stock already in watchlist")]
    AlreadyWatched(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct WatchlistService {
    store: Arc<dyn WatchlistStore>,
    quotes: Arc<QuoteService>,
}

impl WatchlistService {
    pub fn new(store: Arc<dyn WatchlistStore>, quotes: Arc<QuoteService>) -> Self {
        Self { store, quotes }
    }

    /// Watchlist items with refreshed prices.
    pub async fn list(&self, user_id: &str) -> Result<Vec<WatchlistItem>, StoreError> {
        let (items, _) = self.list_and_refresh(user_id).await?;
        Ok(items)
    }

    /// Like [`list`](Self::list), also returning the write-back task if one
    /// was started.
    pub async fn list_and_refresh(
        &self,
        user_id: &str,
    ) -> Result<(Vec<WatchlistItem>, Option<JoinHandle<()>>), StoreError> {
        let mut items = self.store.list_watchlist(user_id)?;
        if items.is_empty() {
            return Ok((items, None));
        }

        let quotes = self.quotes.resolve_many(items.iter().map(|i| i.symbol.as_str())).await;

        let mut updates: Vec<(String, Decimal)> = Vec::new();
        for item in &mut items {
            let Some(quote) = quotes.get(&normalize_symbol(&item.symbol)) else {
                continue;
            };
            if item.current_price != Some(quote.price) {
                updates.push((item.id.clone(), quote.price));
                item.current_price = Some(quote.price);
            }
            if item.company_name.trim().is_empty() {
                item.company_name = quote.company_name.clone();
            }
        }

        if updates.is_empty() {
            return Ok((items, None));
        }

        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            match store.update_watchlist_prices(&updates) {
                Ok(n) => debug!("Persisted {} watchlist prices", n),
                Err(e) => warn!("Failed to persist watchlist prices: {}", e),
            }
        });
        Ok((items, Some(handle)))
    }

    /// Watch a symbol. `added_price` defaults to the current price, which is
    /// always recorded as `current_price`.
    pub async fn add(
        &self,
        user_id: &str,
        symbol: &str,
        company_name: Option<String>,
        added_price: Option<Decimal>,
        alert_price: Option<Decimal>,
    ) -> Result<WatchlistItem, WatchlistError> {
        let symbol = normalize_symbol(symbol);
        if self.store.find_watchlist_item(user_id, &symbol)?.is_some() {
            return Err(WatchlistError::AlreadyWatched(symbol));
        }

        let quote = self.quotes.resolve(&symbol, false).await;
        let name = company_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| quote.company_name.clone());

        let mut item = WatchlistItem::new(user_id, &quote.symbol, &name, added_price.or(Some(quote.price)));
        item.current_price = Some(quote.price);
        item.alert_price = alert_price;
        match self.store.add_watchlist_item(&item) {
            Ok(()) => Ok(item),
            // lost a race with a concurrent add
            Err(StoreError::Duplicate(_)) => Err(WatchlistError::AlreadyWatched(quote.symbol)),
            Err(e) => Err(e.into()),
        }
    }
}
