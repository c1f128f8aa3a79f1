//! Deterministic last-resort market data.
//!
//! The synthetic price is a pure function of the symbol so that quotes,
//! trades and tests agree on it without any network access.

use crate::types::SymbolMatch;
use rust_decimal::{Decimal, RoundingStrategy};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233_280;

const MIN_PRICE: i64 = 50;
const PRICE_SPAN: u64 = 200;

/// Symbol used when an empty ticker is priced.
const DEFAULT_SYMBOL: &str = "DEMO";

/// Well-known listings used when every search provider fails.
pub const WELL_KNOWN_SYMBOLS: &[(&str, &str, &str)] = &[
    ("AAPL", "Apple Inc.", "NASDAQ"),
    ("MSFT", "Microsoft Corporation", "NASDAQ"),
    ("GOOGL", "Alphabet Inc. Class A", "NASDAQ"),
    ("AMZN", "Amazon.com, Inc.", "NASDAQ"),
    ("TSLA", "Tesla, Inc.", "NASDAQ"),
    ("META", "Meta Platforms, Inc.", "NASDAQ"),
    ("NVDA", "NVIDIA Corporation", "NASDAQ"),
    ("NFLX", "Netflix, Inc.", "NASDAQ"),
    ("BABA", "Alibaba Group Holding Limited", "NYSE"),
    ("JPM", "JPMorgan Chase & Co.", "NYSE"),
];

/// Sum of the character codes of the uppercased symbol.
fn seed(symbol: &str) -> u64 {
    let symbol = symbol.trim().to_uppercase();
    let symbol = if symbol.is_empty() { DEFAULT_SYMBOL.to_string() } else { symbol };
    symbol.chars().map(|c| c as u64).sum()
}

/// One linear-congruential step over the symbol seed, in `[0, 233280)`.
fn lcg_step(symbol: &str) -> u64 {
    (seed(symbol) * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS
}

/// The LCG output normalized to `[0, 1)`.
pub fn unit_fraction(symbol: &str) -> Decimal {
    Decimal::from(lcg_step(symbol)) / Decimal::from(LCG_MODULUS)
}

/// Unrounded synthetic price in `[50, 250)`.
pub fn synthetic_price_exact(symbol: &str) -> Decimal {
    Decimal::from(lcg_step(symbol) * PRICE_SPAN) / Decimal::from(LCG_MODULUS) + Decimal::from(MIN_PRICE)
}

/// Synthetic price rounded to cents, half away from zero.
pub fn synthetic_price(symbol: &str) -> Decimal {
    round_cents(synthetic_price_exact(symbol))
}

pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Filter the well-known table by symbol prefix or name substring.
pub fn match_well_known(query: &str) -> Vec<SymbolMatch> {
    let needle = query.trim().to_uppercase();
    WELL_KNOWN_SYMBOLS
        .iter()
        .filter(|(symbol, name, _)| symbol.starts_with(&needle) || name.to_uppercase().contains(&needle))
        .map(|(symbol, name, exchange)| SymbolMatch::new(symbol, name, exchange))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_synthetic_price_known_values() {
        assert_eq!(synthetic_price("AAPL"), dec!(172.86));
        assert_eq!(synthetic_price("MSFT"), dec!(196.13));
        assert_eq!(synthetic_price("TSLA"), dec!(148.29));
        assert_eq!(synthetic_price("BRK.B"), dec!(163.59));
    }

    #[test]
    fn test_synthetic_price_is_case_insensitive() {
        assert_eq!(synthetic_price("aapl"), synthetic_price("AAPL"));
        assert_eq!(synthetic_price("  msft "), synthetic_price("MSFT"));
    }

    #[test]
    fn test_empty_symbol_prices_as_demo() {
        assert_eq!(synthetic_price(""), dec!(228.68));
        assert_eq!(synthetic_price(""), synthetic_price("DEMO"));
    }

    #[test]
    fn test_synthetic_price_in_range() {
        for symbol in ["A", "ZZZZZ", "SPY", "QQQ", "X", "GOOGL", "BRK.A", "^GSPC"] {
            let price = synthetic_price(symbol);
            assert!(price >= dec!(50) && price <= dec!(250), "{} -> {}", symbol, price);
        }
    }

    #[test]
    fn test_unit_fraction_in_unit_interval() {
        let f = unit_fraction("AAPL");
        assert!(f >= Decimal::ZERO && f < Decimal::ONE);
        assert_eq!(lcg_step("AAPL"), 143_303);
    }

    #[test]
    fn test_match_well_known_prefix_and_name() {
        let hits = match_well_known("ne");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "NFLX");

        let hits = match_well_known("corporation");
        let symbols: Vec<_> = hits.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "NVDA"]);
    }

    #[test]
    fn test_match_well_known_no_hits() {
        assert!(match_well_known("zzqq").is_empty());
    }
}
