//! Savings goal types.
//!
//! Goal records themselves are stored elsewhere; this module keeps their
//! enum strings and the progress arithmetic shown against them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a goal is saving for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Retirement,
    House,
    Education,
    Emergency,
    Wealth,
    Vacation,
    Other,
}

/// Goal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Achieved,
    Paused,
}

/// Progress of a savings goal toward its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    /// Percent of target saved, two decimal places. Can exceed 100.
    pub progress_pct: Decimal,
    /// `progress_pct` clamped to 100 for progress bars.
    pub display_progress_pct: Decimal,
    pub is_reached: bool,
}

impl GoalProgress {
    pub fn new(target_amount: Decimal, current_amount: Decimal) -> Self {
        let progress_pct = if target_amount <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            current_amount
                .checked_div(target_amount)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::MAX)
                .round_dp(2)
        };

        Self {
            target_amount,
            current_amount,
            progress_pct,
            display_progress_pct: progress_pct.min(Decimal::ONE_HUNDRED),
            is_reached: target_amount > Decimal::ZERO && current_amount >= target_amount,
        }
    }
}
