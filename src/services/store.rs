//! Storage capabilities for accounts, positions, trades and watchlists.
//!
//! The trade engine depends only on [`Ledger`]; concrete backends are
//! [`MemoryStore`] here and [`SqliteStore`](super::SqliteStore).

use super::accounting::PositionChange;
use crate::types::{Account, Position, Trade, WatchlistItem};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Mutex;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait AccountStore: Send + Sync {
    fn load_account(&self, user_id: &str) -> StoreResult<Option<Account>>;
    fn save_account(&self, account: &Account) -> StoreResult<()>;
}

pub trait PositionStore: Send + Sync {
    fn find_position(&self, user_id: &str, symbol: &str) -> StoreResult<Option<Position>>;
    fn save_position(&self, position: &Position) -> StoreResult<()>;
    fn delete_position(&self, user_id: &str, symbol: &str) -> StoreResult<()>;
    /// Open positions ordered by symbol.
    fn list_positions(&self, user_id: &str) -> StoreResult<Vec<Position>>;
}

pub trait TradeStore: Send + Sync {
    fn insert_trade(&self, trade: &Trade) -> StoreResult<()>;
    /// Trades for a user, newest first.
    fn list_trades(&self, user_id: &str) -> StoreResult<Vec<Trade>>;
}

/// Everything one executed trade writes.
#[derive(Debug, Clone)]
pub struct TradeCommit {
    pub trade: Trade,
    pub account: Account,
    pub position: PositionChange,
}

/// Accounts, positions and trades behind a single atomic commit.
pub trait Ledger: AccountStore + PositionStore + TradeStore {
    /// Persist a trade, its account update and its position change as one
    /// unit. Either all three are visible afterwards or none is.
    fn commit(&self, commit: &TradeCommit) -> StoreResult<()>;
}

pub trait WatchlistStore: Send + Sync {
    fn list_watchlist(&self, user_id: &str) -> StoreResult<Vec<WatchlistItem>>;
    fn find_watchlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<Option<WatchlistItem>>;
    /// Insert an item. A user watches each symbol at most once; a second
    /// insert fails with [`StoreError::Duplicate`].
    fn add_watchlist_item(&self, item: &WatchlistItem) -> StoreResult<()>;
    /// Write refreshed prices by item id. Returns the number of rows touched.
    fn update_watchlist_prices(&self, updates: &[(String, Decimal)]) -> StoreResult<usize>;
}

// =============================================================================
// In-memory backend
// =============================================================================

/// DashMap-backed store. Commits are serialized by a single lock.
#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<String, Account>,
    positions: DashMap<(String, String), Position>,
    trades: DashMap<String, Vec<Trade>>,
    watchlist: DashMap<String, Vec<WatchlistItem>>,
    commit_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_position_change(&self, change: &PositionChange) {
        match change {
            PositionChange::Upsert(position) => {
                self.positions
                    .insert((position.user_id.clone(), position.symbol.clone()), position.clone());
            }
            PositionChange::Close { user_id, symbol } => {
                self.positions.remove(&(user_id.clone(), symbol.clone()));
            }
        }
    }
}

impl AccountStore for MemoryStore {
    fn load_account(&self, user_id: &str) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(user_id).map(|a| a.clone()))
    }

    fn save_account(&self, account: &Account) -> StoreResult<()> {
        self.accounts.insert(account.user_id.clone(), account.clone());
        Ok(())
    }
}

impl PositionStore for MemoryStore {
    fn find_position(&self, user_id: &str, symbol: &str) -> StoreResult<Option<Position>> {
        Ok(self
            .positions
            .get(&(user_id.to_string(), symbol.to_string()))
            .map(|p| p.clone()))
    }

    fn save_position(&self, position: &Position) -> StoreResult<()> {
        self.apply_position_change(&PositionChange::Upsert(position.clone()));
        Ok(())
    }

    fn delete_position(&self, user_id: &str, symbol: &str) -> StoreResult<()> {
        self.positions.remove(&(user_id.to_string(), symbol.to_string()));
        Ok(())
    }

    fn list_positions(&self, user_id: &str) -> StoreResult<Vec<Position>> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }
}

impl TradeStore for MemoryStore {
    fn insert_trade(&self, trade: &Trade) -> StoreResult<()> {
        self.trades.entry(trade.user_id.clone()).or_default().push(trade.clone());
        Ok(())
    }

    fn list_trades(&self, user_id: &str) -> StoreResult<Vec<Trade>> {
        let mut trades: Vec<Trade> = self
            .trades
            .get(user_id)
            .map(|t| t.iter().rev().cloned().collect())
            .unwrap_or_default();
        // Stable, so equal timestamps stay newest-inserted first
        trades.sort_by(|a, b| b.trade_date.cmp(&a.trade_date));
        Ok(trades)
    }
}

impl Ledger for MemoryStore {
    fn commit(&self, commit: &TradeCommit) -> StoreResult<()> {
        let _guard = self.commit_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.insert_trade(&commit.trade)?;
        self.save_account(&commit.account)?;
        self.apply_position_change(&commit.position);
        Ok(())
    }
}

impl WatchlistStore for MemoryStore {
    fn list_watchlist(&self, user_id: &str) -> StoreResult<Vec<WatchlistItem>> {
        Ok(self.watchlist.get(user_id).map(|items| items.clone()).unwrap_or_default())
    }

    fn find_watchlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<Option<WatchlistItem>> {
        Ok(self
            .watchlist
            .get(user_id)
            .and_then(|items| items.iter().find(|i| i.symbol == symbol).cloned()))
    }

    fn add_watchlist_item(&self, item: &WatchlistItem) -> StoreResult<()> {
        let mut items = self.watchlist.entry(item.user_id.clone()).or_default();
        if items.iter().any(|i| i.symbol == item.symbol) {
            return Err(StoreError::Duplicate(format!("{} watching {}", item.user_id, item.symbol)));
        }
        items.push(item.clone());
        Ok(())
    }

    fn update_watchlist_prices(&self, updates: &[(String, Decimal)]) -> StoreResult<usize> {
        let mut touched = 0;
        for mut items in self.watchlist.iter_mut() {
            for item in items.iter_mut() {
                if let Some((_, price)) = updates.iter().find(|(id, _)| *id == item.id) {
                    item.current_price = Some(*price);
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }
}
