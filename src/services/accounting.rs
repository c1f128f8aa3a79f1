//! Position and cash arithmetic for executed trades.
//!
//! Everything here is pure: inputs are the current records and the trade,
//! outputs are the records to persist. Order validation happens before these
//! functions are called.

use crate::types::{Account, Position, Trade, TradeType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a sell affects an account's cumulative invested amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestedOnSell {
    /// Leave the running total untouched. Matches the historical ledgers.
    #[default]
    Retain,
    /// Subtract the cost basis of the sold shares, floored at zero.
    ReduceByCostBasis,
}

/// What to do with the position record after a fill.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionChange {
    Upsert(Position),
    Close { user_id: String, symbol: String },
}

impl PositionChange {
    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionChange::Upsert(position) => Some(position),
            PositionChange::Close { .. } => None,
        }
    }
}

/// A fill whose arithmetic leaves the range of `i64` shares or `Decimal`
/// money. Nothing is applied when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} out of range")]
pub struct OutOfRange(pub &'static str);

/// `quantity * price`, or `None` when it does not fit a `Decimal`.
pub fn checked_total(quantity: i64, price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(price)
}

/// Open a position or blend a buy into the existing one.
///
/// Average cost becomes `(q_old * avg_old + total) / (q_old + q)`.
pub fn apply_buy(existing: Option<Position>, trade: &Trade) -> Result<Position, OutOfRange> {
    let Some(mut position) = existing else {
        checked_total(trade.quantity, trade.price).ok_or(OutOfRange("order total"))?;
        let mut opened = Position::open(&trade.user_id, &trade.symbol, &trade.company_name, trade.quantity, trade.price);
        opened.created_at = trade.trade_date;
        opened.updated_at = trade.trade_date;
        return Ok(opened);
    };

    let quantity = position
        .quantity
        .checked_add(trade.quantity)
        .ok_or(OutOfRange("position quantity"))?;
    let blended = checked_total(position.quantity, position.average_cost)
        .and_then(|held| held.checked_add(trade.total_amount))
        .ok_or(OutOfRange("position cost"))?;
    let cost_basis_total = position
        .cost_basis_total
        .checked_add(trade.total_amount)
        .ok_or(OutOfRange("position cost"))?;
    checked_total(quantity, trade.price).ok_or(OutOfRange("position value"))?;

    position.average_cost = blended / Decimal::from(quantity);
    position.quantity = quantity;
    position.cost_basis_total = cost_basis_total;
    position.updated_at = trade.trade_date;
    position.update_price(trade.price);
    Ok(position)
}

/// Cost basis leaving the position when `quantity` shares are sold. Never
/// more than the position's whole cost basis.
pub fn released_cost_basis(position: &Position, quantity: i64) -> Decimal {
    if quantity >= position.quantity {
        return position.cost_basis_total;
    }
    checked_total(quantity, position.average_cost)
        .map(|released| released.min(position.cost_basis_total))
        .unwrap_or(position.cost_basis_total)
}

/// Reduce a position by a sell. Average cost is unchanged; selling the whole
/// holding closes the record.
pub fn apply_sell(mut position: Position, trade: &Trade) -> PositionChange {
    let remaining = position.quantity - trade.quantity;
    if remaining <= 0 {
        return PositionChange::Close {
            user_id: position.user_id,
            symbol: position.symbol,
        };
    }

    position.cost_basis_total -= released_cost_basis(&position, trade.quantity);
    position.quantity = remaining;
    position.updated_at = trade.trade_date;
    position.update_price(trade.price);
    PositionChange::Upsert(position)
}

/// Apply a trade's cash movement to the account.
///
/// `released_cost` is only consulted for sells under
/// [`InvestedOnSell::ReduceByCostBasis`].
pub fn settle_account(
    mut account: Account,
    trade: &Trade,
    released_cost: Decimal,
    policy: InvestedOnSell,
) -> Result<Account, OutOfRange> {
    match trade.side {
        TradeType::Buy => {
            account.cumulative_invested = account
                .cumulative_invested
                .checked_add(trade.total_amount)
                .ok_or(OutOfRange("cumulative invested"))?;
            account.cash_balance -= trade.total_amount;
        }
        TradeType::Sell => {
            account.cash_balance = account
                .cash_balance
                .checked_add(trade.total_amount)
                .ok_or(OutOfRange("cash balance"))?;
            if policy == InvestedOnSell::ReduceByCostBasis {
                account.cumulative_invested = (account.cumulative_invested - released_cost).max(Decimal::ZERO);
            }
        }
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderType;
    use rust_decimal_macros::dec;

    fn trade(side: TradeType, quantity: i64, price: Decimal) -> Trade {
        Trade::new("u1", "AAPL", "Apple Inc.", side, quantity, price, OrderType::Market)
    }

    #[test]
    fn test_first_buy_opens_position() {
        let position = apply_buy(None, &trade(TradeType::Buy, 10, dec!(150))).unwrap();
        assert_eq!(position.quantity, 10);
        assert_eq!(position.average_cost, dec!(150));
        assert_eq!(position.cost_basis_total, dec!(1500));
        assert_eq!(position.last_price, dec!(150));
        assert_eq!(position.unrealized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_second_buy_blends_average_cost() {
        let position = apply_buy(None, &trade(TradeType::Buy, 10, dec!(150))).unwrap();
        let position = apply_buy(Some(position), &trade(TradeType::Buy, 5, dec!(180))).unwrap();
        assert_eq!(position.quantity, 15);
        assert_eq!(position.average_cost, dec!(160));
        assert_eq!(position.cost_basis_total, dec!(2400));
        assert_eq!(position.last_price, dec!(180));
        assert_eq!(position.market_value, dec!(2700));
        assert_eq!(position.unrealized_pnl, dec!(300));
        assert_eq!(position.unrealized_pnl_pct, dec!(12.5));
    }

    #[test]
    fn test_partial_sell_keeps_average_cost() {
        let position = apply_buy(None, &trade(TradeType::Buy, 10, dec!(100))).unwrap();
        let change = apply_sell(position, &trade(TradeType::Sell, 4, dec!(120)));
        let position = change.position().unwrap();
        assert_eq!(position.quantity, 6);
        assert_eq!(position.average_cost, dec!(100));
        assert_eq!(position.cost_basis_total, dec!(600));
        assert_eq!(position.last_price, dec!(120));
        assert_eq!(position.unrealized_pnl, dec!(120));
    }

    #[test]
    fn test_full_sell_closes_position() {
        let position = apply_buy(None, &trade(TradeType::Buy, 15, dec!(160))).unwrap();
        let change = apply_sell(position, &trade(TradeType::Sell, 15, dec!(200)));
        assert_eq!(
            change,
            PositionChange::Close {
                user_id: "u1".to_string(),
                symbol: "AAPL".to_string()
            }
        );
        assert!(change.position().is_none());
    }

    #[test]
    fn test_released_cost_basis() {
        let position = apply_buy(None, &trade(TradeType::Buy, 3, dec!(10))).unwrap();
        let position = apply_buy(Some(position), &trade(TradeType::Buy, 1, dec!(11))).unwrap();
        assert_eq!(released_cost_basis(&position, 2), position.average_cost * dec!(2));
        assert_eq!(released_cost_basis(&position, 4), dec!(41));
    }

    #[test]
    fn test_settle_buy_and_sell() {
        let account = Account::new("u1", dec!(10000));
        let account = settle_account(account, &trade(TradeType::Buy, 10, dec!(150)), Decimal::ZERO, InvestedOnSell::Retain).unwrap();
        assert_eq!(account.cash_balance, dec!(8500));
        assert_eq!(account.cumulative_invested, dec!(1500));

        let account = settle_account(account, &trade(TradeType::Sell, 10, dec!(200)), dec!(1500), InvestedOnSell::Retain).unwrap();
        assert_eq!(account.cash_balance, dec!(10500));
        assert_eq!(account.cumulative_invested, dec!(1500));
    }

    #[test]
    fn test_settle_sell_reducing_invested() {
        let mut account = Account::new("u1", dec!(0));
        account.cumulative_invested = dec!(1000);

        let sell = trade(TradeType::Sell, 5, dec!(50));
        let account = settle_account(account, &sell, dec!(400), InvestedOnSell::ReduceByCostBasis).unwrap();
        assert_eq!(account.cash_balance, dec!(250));
        assert_eq!(account.cumulative_invested, dec!(600));

        let account = settle_account(account, &sell, dec!(900), InvestedOnSell::ReduceByCostBasis).unwrap();
        assert_eq!(account.cumulative_invested, Decimal::ZERO);
    }

    #[test]
    fn test_buy_past_max_quantity_is_out_of_range() {
        let position = apply_buy(None, &trade(TradeType::Buy, i64::MAX, dec!(0.0000000001))).unwrap();
        let result = apply_buy(Some(position), &trade(TradeType::Buy, 1, dec!(1)));
        assert_eq!(result, Err(OutOfRange("position quantity")));
    }

    #[test]
    fn test_buy_with_unrepresentable_value_is_out_of_range() {
        let position = apply_buy(None, &trade(TradeType::Buy, 1_000_000_000, dec!(0.000001))).unwrap();
        let pricey = Trade {
            price: Decimal::MAX / dec!(10),
            ..trade(TradeType::Buy, 1, dec!(1))
        };
        assert_eq!(apply_buy(Some(position), &pricey), Err(OutOfRange("position value")));
    }

    #[test]
    fn test_checked_total() {
        assert_eq!(checked_total(10, dec!(1.5)), Some(dec!(15)));
        assert_eq!(checked_total(i64::MAX, Decimal::MAX), None);
    }

    #[test]
    fn test_released_cost_basis_never_exceeds_held_cost() {
        let mut position = apply_buy(None, &trade(TradeType::Buy, 10, dec!(10))).unwrap();
        position.average_cost = dec!(11);
        assert_eq!(released_cost_basis(&position, 9), dec!(99));
        position.average_cost = Decimal::MAX;
        assert_eq!(released_cost_basis(&position, 9), dec!(100));
    }

    #[test]
    fn test_settle_sell_past_max_cash_is_out_of_range() {
        let account = Account::new("u1", Decimal::MAX);
        let sell = trade(TradeType::Sell, 1, dec!(1));
        let result = settle_account(account, &sell, Decimal::ZERO, InvestedOnSell::Retain);
        assert_eq!(result, Err(OutOfRange("cash balance")));
    }
}
