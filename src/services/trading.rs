//! Trading Service
//!
//! Executes simulated market and limit orders against a user's cash account
//! and position book:
//! - Order validation (symbol, quantity, price)
//! - Price resolution through the quote service when no price is supplied
//! - Balance and holdings checks
//! - Atomic commit of trade, account and position changes
//!
//! Orders for the same user are serialized; different users execute in
//! parallel.

use super::accounting::{
    apply_buy, apply_sell, checked_total, released_cost_basis, settle_account, InvestedOnSell, OutOfRange,
    PositionChange,
};
use super::quote::{normalize_symbol, QuoteService};
use super::store::{Ledger, StoreError, TradeCommit};
use crate::config::Config;
use crate::types::{Account, Position, Trade, TradeRequest, TradeType};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Trading service errors.
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("Insufficient shares: requested {requested}, holding {held}")]
    InsufficientShares { requested: i64, held: i64 },

    #[error("No position in {0}")]
    NoPosition(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<OutOfRange> for TradingError {
    fn from(e: OutOfRange) -> Self {
        TradingError::InvalidOrder(e.to_string())
    }
}

impl From<StoreError> for TradingError {
    fn from(e: StoreError) -> Self {
        TradingError::Storage(e.to_string())
    }
}

/// Account and settlement policy.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Cash credited when an account is opened
    pub starting_balance: Decimal,
    /// Effect of sells on cumulative invested
    pub invested_on_sell: InvestedOnSell,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(10_000),
            invested_on_sell: InvestedOnSell::Retain,
        }
    }
}

impl ExecutionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            starting_balance: config.starting_balance,
            invested_on_sell: if config.reduce_invested_on_sell {
                InvestedOnSell::ReduceByCostBasis
            } else {
                InvestedOnSell::Retain
            },
        }
    }
}

/// Paper trading service.
#[derive(Clone)]
pub struct TradingService {
    ledger: Arc<dyn Ledger>,
    quotes: Arc<QuoteService>,
    config: ExecutionConfig,
    /// Per-user execution locks (user_id -> lock)
    user_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TradingService {
    /// Create a new trading service.
    pub fn new(ledger: Arc<dyn Ledger>, quotes: Arc<QuoteService>, config: ExecutionConfig) -> Self {
        Self {
            ledger,
            quotes,
            config,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks.entry(user_id.to_string()).or_default().value().clone()
    }

    // ========== Accounts ==========

    /// Open an account with the starting balance. Returns the existing
    /// account unchanged if there already is one.
    pub async fn open_account(&self, user_id: &str) -> Result<Account, TradingError> {
        if user_id.trim().is_empty() {
            return Err(TradingError::InvalidOrder("user id is required".to_string()));
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(account) = self.ledger.load_account(user_id)? {
            return Ok(account);
        }

        let account = Account::new(user_id, self.config.starting_balance);
        self.ledger.save_account(&account)?;
        info!("Opened account {} with {}", user_id, account.cash_balance);
        Ok(account)
    }

    pub fn account(&self, user_id: &str) -> Result<Account, TradingError> {
        self.ledger
            .load_account(user_id)?
            .ok_or_else(|| TradingError::AccountNotFound(user_id.to_string()))
    }

    /// Stored positions, ordered by symbol. Prices are as of the last fill.
    pub fn positions(&self, user_id: &str) -> Result<Vec<Position>, TradingError> {
        Ok(self.ledger.list_positions(user_id)?)
    }

    /// Trade history, newest first.
    pub fn trades(&self, user_id: &str) -> Result<Vec<Trade>, TradingError> {
        Ok(self.ledger.list_trades(user_id)?)
    }

    // ========== Execution ==========

    /// Validate and execute an order. Nothing is written unless every check
    /// passes.
    pub async fn execute(&self, request: TradeRequest) -> Result<Trade, TradingError> {
        let user_id = request.user_id.trim().to_string();
        let symbol = normalize_symbol(&request.symbol);

        if user_id.is_empty() {
            return Err(TradingError::InvalidOrder("user id is required".to_string()));
        }
        if symbol.is_empty() {
            return Err(TradingError::InvalidOrder("symbol is required".to_string()));
        }
        if request.quantity <= 0 {
            return Err(TradingError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if let Some(price) = request.price {
            if price <= Decimal::ZERO {
                return Err(TradingError::InvalidOrder(format!("price must be positive, got {}", price)));
            }
        }

        let mut company_name = request
            .company_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let price = match request.price {
            Some(price) => price,
            None => {
                let quote = self.quotes.resolve(&symbol, false).await;
                debug!("Resolved {} at {} (fallback: {})", symbol, quote.price, quote.is_fallback);
                if company_name.is_none() {
                    company_name = Some(quote.company_name);
                }
                quote.price
            }
        };

        let needed = checked_total(request.quantity, price).ok_or(OutOfRange("order total"))?;

        let lock = self.user_lock(&user_id);
        let _guard = lock.lock().await;

        let account = self
            .ledger
            .load_account(&user_id)?
            .ok_or_else(|| TradingError::AccountNotFound(user_id.clone()))?;
        let existing = self.ledger.find_position(&user_id, &symbol)?;

        let released = match (request.side, &existing) {
            (TradeType::Buy, _) => {
                if account.cash_balance < needed {
                    return Err(TradingError::InsufficientBalance {
                        needed,
                        available: account.cash_balance,
                    });
                }
                Decimal::ZERO
            }
            (TradeType::Sell, None) => return Err(TradingError::NoPosition(symbol)),
            (TradeType::Sell, Some(position)) => {
                if position.quantity < request.quantity {
                    return Err(TradingError::InsufficientShares {
                        requested: request.quantity,
                        held: position.quantity,
                    });
                }
                released_cost_basis(position, request.quantity)
            }
        };

        let company_name = company_name
            .or_else(|| existing.as_ref().map(|p| p.company_name.clone()))
            .unwrap_or_else(|| symbol.clone());

        let trade = Trade::new(
            &user_id,
            &symbol,
            company_name,
            request.side,
            request.quantity,
            price,
            request.order_type,
        );

        let position = match (request.side, existing) {
            (TradeType::Buy, existing) => PositionChange::Upsert(apply_buy(existing, &trade)?),
            (TradeType::Sell, Some(position)) => apply_sell(position, &trade),
            (TradeType::Sell, None) => return Err(TradingError::NoPosition(symbol)),
        };
        let account = settle_account(account, &trade, released, self.config.invested_on_sell)?;

        self.ledger.commit(&TradeCommit {
            trade: trade.clone(),
            account,
            position,
        })?;

        info!(
            "Executed {} {} {} @ {} for {} (total {})",
            trade.side, trade.quantity, trade.symbol, trade.price, user_id, trade.total_amount
        );
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;
    use crate::types::OrderType;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn service() -> TradingService {
        let quotes = Arc::new(QuoteService::new(vec![], Duration::from_secs(60), Duration::from_secs(1)));
        TradingService::new(Arc::new(MemoryStore::new()), quotes, ExecutionConfig::default())
    }

    fn request(side: TradeType, quantity: i64, price: Option<Decimal>) -> TradeRequest {
        TradeRequest {
            user_id: "u1".to_string(),
            symbol: "aapl".to_string(),
            company_name: None,
            side,
            quantity,
            price,
            order_type: OrderType::Market,
        }
    }

    #[tokio::test]
    async fn test_open_account_is_idempotent() {
        let svc = service();
        let first = svc.open_account("u1").await.unwrap();
        let second = svc.open_account("u1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.cash_balance, dec!(10000));
    }

    #[tokio::test]
    async fn test_invalid_orders() {
        let svc = service();
        svc.open_account("u1").await.unwrap();

        let zero_qty = svc.execute(request(TradeType::Buy, 0, Some(dec!(10)))).await;
        assert!(matches!(zero_qty, Err(TradingError::InvalidOrder(_))));

        let bad_price = svc.execute(request(TradeType::Buy, 1, Some(dec!(-1)))).await;
        assert!(matches!(bad_price, Err(TradingError::InvalidOrder(_))));

        let mut blank = request(TradeType::Buy, 1, Some(dec!(10)));
        blank.symbol = "  ".to_string();
        assert!(matches!(svc.execute(blank).await, Err(TradingError::InvalidOrder(_))));
    }

    #[tokio::test]
    async fn test_missing_account() {
        let svc = service();
        let result = svc.execute(request(TradeType::Buy, 1, Some(dec!(10)))).await;
        assert!(matches!(result, Err(TradingError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_market_order_uses_resolved_quote() {
        let svc = service();
        svc.open_account("u1").await.unwrap();

        let trade = svc.execute(request(TradeType::Buy, 2, None)).await.unwrap();
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.price, dec!(172.86));
        assert_eq!(trade.total_amount, dec!(345.72));
        assert_eq!(trade.company_name, "AAPL");
        assert_eq!(svc.account("u1").unwrap().cash_balance, dec!(9654.28));
    }

    #[tokio::test]
    async fn test_sell_without_position() {
        let svc = service();
        svc.open_account("u1").await.unwrap();
        let result = svc.execute(request(TradeType::Sell, 1, Some(dec!(10)))).await;
        assert!(matches!(result, Err(TradingError::NoPosition(ref s)) if s == "AAPL"));
    }
}
