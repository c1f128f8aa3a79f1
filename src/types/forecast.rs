//! Price forecast types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Analyst-style recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Recommendation {
    /// Ordered from most bearish to most bullish.
    pub const ALL: [Recommendation; 5] = [
        Recommendation::StrongSell,
        Recommendation::Sell,
        Recommendation::Hold,
        Recommendation::Buy,
        Recommendation::StrongBuy,
    ];
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::StrongSell => write!(f, "strong_sell"),
            Recommendation::Sell => write!(f, "sell"),
            Recommendation::Hold => write!(f, "hold"),
            Recommendation::Buy => write!(f, "buy"),
            Recommendation::StrongBuy => write!(f, "strong_buy"),
        }
    }
}

/// Risk bucket attached to a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// A price forecast for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(rename = "stock_symbol")]
    pub symbol: String,
    pub current_price: Decimal,
    pub predicted_price_1d: Decimal,
    pub predicted_price_7d: Decimal,
    pub predicted_price_30d: Decimal,
    pub recommendation: Recommendation,
    pub confidence_score: u32,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    /// Placeholder data produced without a model
    pub fallback: bool,
}
