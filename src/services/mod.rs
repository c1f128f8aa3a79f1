pub mod accounting;
pub mod cache;
pub mod forecast;
pub mod portfolio;
pub mod quote;
pub mod search;
pub mod sqlite_store;
pub mod store;
pub mod trading;
pub mod watchlist;

pub use accounting::{InvestedOnSell, PositionChange};
pub use cache::Cache;
pub use forecast::fallback_forecast;
pub use portfolio::PortfolioService;
pub use quote::QuoteService;
pub use search::SymbolSearch;
pub use sqlite_store::SqliteStore;
pub use store::{
    AccountStore, Ledger, MemoryStore, PositionStore, StoreError, TradeCommit, TradeStore, WatchlistStore,
};
pub use trading::{ExecutionConfig, TradingError, TradingService};
pub use watchlist::{WatchlistError, WatchlistService};
