//! Placeholder price forecasts.
//!
//! Without a language-model backend the forecast endpoint serves a
//! deterministic projection driven by the same generator as the synthetic
//! quote, so a symbol always gets the same numbers.

use crate::sources::fallback::{round_cents, synthetic_price_exact, unit_fraction};
use crate::types::{Forecast, Recommendation, RiskLevel};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const DEFAULT_SYMBOL: &str = "DEMO";

const MIN_CONFIDENCE: u32 = 40;
const MAX_CONFIDENCE: u32 = 95;

/// Index into a table of `len` entries for a fraction in `[0, 1)`.
fn pick(fraction: Decimal, len: usize) -> usize {
    (fraction * Decimal::from(len))
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(len.saturating_sub(1))
}

/// Deterministic forecast for a symbol.
///
/// Each horizon drifts the synthetic base price by `span * f - span / 2`,
/// where `f` is the symbol's generator fraction and `span` widens with the
/// horizon (2%, 6%, 15%).
pub fn fallback_forecast(symbol: &str) -> Forecast {
    let symbol = symbol.trim().to_uppercase();
    let symbol = if symbol.is_empty() { DEFAULT_SYMBOL.to_string() } else { symbol };

    let f = unit_fraction(&symbol);
    let base = synthetic_price_exact(&symbol);
    let drift = |span: Decimal| round_cents(base * (Decimal::ONE + f * span - span / dec!(2)));

    let confidence = (f * Decimal::ONE_HUNDRED)
        .floor()
        .to_u32()
        .unwrap_or(MIN_CONFIDENCE)
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);

    Forecast {
        current_price: round_cents(base),
        predicted_price_1d: drift(dec!(0.02)),
        predicted_price_7d: drift(dec!(0.06)),
        predicted_price_30d: drift(dec!(0.15)),
        recommendation: Recommendation::ALL[pick(f, Recommendation::ALL.len())],
        confidence_score: confidence,
        risk_level: RiskLevel::ALL[pick(f, RiskLevel::ALL.len())],
        reasoning: format!(
            "Mocked analysis for {} due to AI service limits. This is placeholder data to keep the demo functional.",
            symbol
        ),
        symbol,
        fallback: true,
    }
}
