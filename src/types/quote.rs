//! Quote and symbol search types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A resolved spot quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Uppercased ticker
    pub symbol: String,
    pub company_name: String,
    pub price: Decimal,
    /// True when no live source answered and the price is synthetic
    #[serde(rename = "fallback")]
    pub is_fallback: bool,
}

/// A symbol search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
}

impl SymbolMatch {
    pub fn new(symbol: &str, name: &str, exchange: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            exchange: exchange.to_string(),
        }
    }
}
