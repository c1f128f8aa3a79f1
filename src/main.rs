use std::sync::Arc;
use stocksense::config::Config;
use stocksense::services::{QuoteService, SqliteStore, SymbolSearch};
use stocksense::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stocksense=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Starting StockSense server on {}", config.bind_address());

    let store = if config.database_path == ":memory:" {
        SqliteStore::new_in_memory()?
    } else {
        SqliteStore::new(&config.database_path)?
    };
    let store = Arc::new(store);

    let quotes = Arc::new(QuoteService::from_config(&config.quotes)?);
    let _cache_sweeper = quotes.start_cache_sweeper();
    info!("Quote providers: {}", quotes.provider_names().join(" -> "));
    if config.quotes.alpha_vantage_api_key.is_none() {
        info!("ALPHAVANTAGE_API_KEY not set, skipping Alpha Vantage");
    }
    let search = Arc::new(SymbolSearch::from_config(&config.quotes)?);

    let addr = config.bind_address();
    let state = AppState::new(config, store, quotes, search);
    let app = stocksense::app(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("StockSense server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
