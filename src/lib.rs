//! StockSense - virtual stock trading simulator
//!
//! Paper-money trading against live quotes with a deterministic synthetic
//! fallback, a weighted-average position book and an axum HTTP surface.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use axum::Router;
use config::Config;
use services::{
    ExecutionConfig, Ledger, PortfolioService, QuoteService, SymbolSearch, TradingService, WatchlistService,
    WatchlistStore,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub trading: TradingService,
    pub quotes: Arc<QuoteService>,
    pub search: Arc<SymbolSearch>,
    pub portfolio: Arc<PortfolioService>,
    pub watchlist: Arc<WatchlistService>,
}

impl AppState {
    /// Wire every service over one store and one quote service.
    pub fn new<S>(config: Config, store: Arc<S>, quotes: Arc<QuoteService>, search: Arc<SymbolSearch>) -> Self
    where
        S: Ledger + WatchlistStore + 'static,
    {
        let ledger: Arc<dyn Ledger> = store.clone();
        let watchlist_store: Arc<dyn WatchlistStore> = store;

        Self {
            trading: TradingService::new(ledger.clone(), quotes.clone(), ExecutionConfig::from_config(&config)),
            portfolio: Arc::new(PortfolioService::new(ledger, quotes.clone())),
            watchlist: Arc::new(WatchlistService::new(watchlist_store, quotes.clone())),
            config: Arc::new(config),
            quotes,
            search,
        }
    }
}

/// Build the HTTP application with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
