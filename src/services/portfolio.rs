//! Portfolio valuation.
//!
//! Marks stored positions to current quotes and aggregates them with the
//! account into a summary. Read-only: marked prices are not written back.

use super::quote::QuoteService;
use super::store::Ledger;
use super::trading::TradingError;
use crate::types::{Account, PortfolioSummary, Position};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

pub struct PortfolioService {
    ledger: Arc<dyn Ledger>,
    quotes: Arc<QuoteService>,
}

impl PortfolioService {
    pub fn new(ledger: Arc<dyn Ledger>, quotes: Arc<QuoteService>) -> Self {
        Self { ledger, quotes }
    }

    /// Open positions marked to the latest (possibly cached) quotes.
    pub async fn positions(&self, user_id: &str) -> Result<Vec<Position>, TradingError> {
        let mut positions = self.ledger.list_positions(user_id)?;
        if positions.is_empty() {
            return Ok(positions);
        }

        let quotes = self.quotes.resolve_many(positions.iter().map(|p| p.symbol.as_str())).await;
        for position in &mut positions {
            if let Some(quote) = quotes.get(&position.symbol) {
                position.update_price(quote.price);
            }
        }
        debug!("Marked {} positions for {}", positions.len(), user_id);
        Ok(positions)
    }

    pub async fn summary(&self, user_id: &str) -> Result<PortfolioSummary, TradingError> {
        let account = self
            .ledger
            .load_account(user_id)?
            .ok_or_else(|| TradingError::AccountNotFound(user_id.to_string()))?;
        let positions = self.positions(user_id).await?;
        Ok(summarize(&account, &positions))
    }
}

/// Aggregate an account and its marked positions.
pub fn summarize(account: &Account, positions: &[Position]) -> PortfolioSummary {
    let total_invested = positions
        .iter()
        .fold(Decimal::ZERO, |sum, p| sum.saturating_add(p.cost_basis_total));
    let total_value = positions
        .iter()
        .fold(Decimal::ZERO, |sum, p| sum.saturating_add(p.market_value));
    let total_pnl = total_value.saturating_sub(total_invested);
    let total_pnl_pct = total_pnl
        .checked_div(total_invested)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO);

    PortfolioSummary {
        cash_balance: account.cash_balance,
        cumulative_invested: account.cumulative_invested,
        total_invested,
        total_value,
        total_pnl,
        total_pnl_pct,
        equity: account.cash_balance.saturating_add(total_value),
        position_count: positions.len(),
    }
}
