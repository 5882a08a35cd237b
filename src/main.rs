use anyhow::Context;
use fill_reconciler::{
    api, config::Config, db::init_db, spawn_schedule, BinanceTradeSource, Reconciler, Repository,
    TradeSource,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    tracing::info!(?config, "Loaded configuration");

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    let source: Arc<dyn TradeSource> = Arc::new(
        BinanceTradeSource::new(
            config.binance_api_url.clone(),
            config.binance_api_key.clone(),
            config.binance_api_secret.clone(),
        )
        .with_chunk_ms(config.fetch_chunk_ms),
    );
    let reconciler = Arc::new(Reconciler::new(
        source,
        repo.clone(),
        config.symbol.clone(),
        config.lookback_ms,
    ));

    if config.reconcile_interval_secs > 0 {
        spawn_schedule(
            reconciler,
            Duration::from_secs(config.reconcile_interval_secs),
        );
    } else {
        tracing::info!("Reconciliation schedule disabled");
    }

    let port = config.port;
    let app = api::create_router(api::AppState::new(repo, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
