//! Trading Types
//!
//! Accounts, positions and trade records for the paper trading ledger.
//! Serialized field names follow the stored record layout (`stock_symbol`,
//! `trade_type`, `average_price`, ...) so existing records stay readable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Enums
// =============================================================================

/// Trade side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type: {}", other)),
        }
    }
}

/// Order style. Recorded on the trade only; both styles fill immediately
/// at the resolved price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(format!("unknown order type: {}", other)),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// A user's cash account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    /// Spendable cash. Only buys check it against zero.
    #[serde(rename = "virtual_balance")]
    pub cash_balance: Decimal,
    /// Running total of money put into buys.
    #[serde(rename = "total_invested")]
    pub cumulative_invested: Decimal,
    #[serde(rename = "created_date")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account funded with the given starting balance.
    pub fn new(user_id: impl Into<String>, starting_balance: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            cash_balance: starting_balance,
            cumulative_invested: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Position
// =============================================================================

/// An open holding of one symbol. Exists only while `quantity > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: String,
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    pub company_name: String,
    pub quantity: i64,
    /// Weighted average cost per share
    #[serde(rename = "average_price")]
    pub average_cost: Decimal,
    /// Amount paid for the shares currently held
    #[serde(rename = "total_invested")]
    pub cost_basis_total: Decimal,
    #[serde(rename = "current_price")]
    pub last_price: Decimal,
    #[serde(rename = "current_value")]
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    #[serde(rename = "unrealized_pnl_percentage")]
    pub unrealized_pnl_pct: Decimal,
    #[serde(rename = "created_date")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updated_date")]
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Open a position from a first purchase.
    pub fn open(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        quantity: i64,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        let mut position = Self {
            user_id: user_id.into(),
            symbol: symbol.into(),
            company_name: company_name.into(),
            quantity,
            average_cost: price,
            cost_basis_total: Decimal::from(quantity).saturating_mul(price),
            last_price: price,
            market_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        position.recalculate();
        position
    }

    /// Mark the position to a new market price.
    pub fn update_price(&mut self, price: Decimal) {
        self.last_price = price;
        self.recalculate();
    }

    /// Recompute market value and unrealized P&L from quantity, last price
    /// and cost basis. Values past the `Decimal` range saturate; a percentage
    /// that cannot be represented (or has no cost basis) reads as zero.
    pub fn recalculate(&mut self) {
        self.market_value = Decimal::from(self.quantity).saturating_mul(self.last_price);
        self.unrealized_pnl = self.market_value.saturating_sub(self.cost_basis_total);
        self.unrealized_pnl_pct = self
            .unrealized_pnl
            .checked_div(self.cost_basis_total)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO);
    }
}

// =============================================================================
// Trade
// =============================================================================

/// An executed trade. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    pub company_name: String,
    #[serde(rename = "trade_type")]
    pub side: TradeType,
    pub quantity: i64,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub order_type: OrderType,
    pub trade_date: DateTime<Utc>,
}

impl Trade {
    /// Create a new trade record; `total_amount` is derived and saturates at
    /// the `Decimal` range. The trading service rejects such orders first.
    pub fn new(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        side: TradeType,
        quantity: i64,
        price: Decimal,
        order_type: OrderType,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            symbol: symbol.into(),
            company_name: company_name.into(),
            side,
            quantity,
            price,
            total_amount: Decimal::from(quantity).saturating_mul(price),
            order_type,
            trade_date: Utc::now(),
        }
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// A proposed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(rename = "trade_type")]
    pub side: TradeType,
    pub quantity: i64,
    /// Execution price; resolved from the quote service when absent.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub order_type: OrderType,
}

/// Aggregate view of an account and its marked-to-market positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub cash_balance: Decimal,
    pub cumulative_invested: Decimal,
    /// Sum of position cost bases
    pub total_invested: Decimal,
    /// Sum of position market values
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_pct: Decimal,
    /// Cash plus market value
    pub equity: Decimal,
    pub position_count: usize,
}
