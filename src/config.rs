use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Quote resolution settings.
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Alpha Vantage API key. Without it the keyed provider is skipped.
    pub alpha_vantage_api_key: Option<String>,
    /// Freshness window for cached quotes.
    pub cache_ttl_secs: u64,
    /// Per-call timeout for JSON providers.
    pub timeout_secs: u64,
    /// Per-call timeout for the CSV provider.
    pub csv_timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            cache_ttl_secs: 60,
            timeout_secs: 6,
            csv_timeout_secs: 4,
        }
    }
}

impl QuoteConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn csv_timeout(&self) -> Duration {
        Duration::from_secs(self.csv_timeout_secs)
    }
}

/// Server configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database path. `:memory:` opens an in-memory database.
    pub database_path: String,
    pub quotes: QuoteConfig,
    /// Cash credited to newly opened accounts.
    pub starting_balance: Decimal,
    /// Reduce cumulative invested by the sold cost basis on sells.
    pub reduce_invested_on_sell: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: "stocksense.db".to_string(),
            quotes: QuoteConfig::default(),
            starting_balance: Decimal::from(10_000),
            reduce_invested_on_sell: false,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let quote_defaults = QuoteConfig::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            quotes: QuoteConfig {
                alpha_vantage_api_key: env::var("ALPHAVANTAGE_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                cache_ttl_secs: parsed("QUOTE_CACHE_TTL_SECS").unwrap_or(quote_defaults.cache_ttl_secs),
                timeout_secs: parsed("QUOTE_TIMEOUT_SECS").unwrap_or(quote_defaults.timeout_secs),
                csv_timeout_secs: parsed("CSV_QUOTE_TIMEOUT_SECS").unwrap_or(quote_defaults.csv_timeout_secs),
            },
            starting_balance: parsed("STARTING_BALANCE")
                .filter(|b: &Decimal| *b >= Decimal::ZERO)
                .unwrap_or(defaults.starting_balance),
            reduce_invested_on_sell: flag("REDUCE_INVESTED_ON_SELL").unwrap_or(defaults.reduce_invested_on_sell),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.starting_balance, dec!(10000));
        assert!(!config.reduce_invested_on_sell);
        assert_eq!(config.quotes.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.quotes.timeout(), Duration::from_secs(6));
        assert_eq!(config.quotes.csv_timeout(), Duration::from_secs(4));
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }
}
