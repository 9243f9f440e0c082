use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sharedash::{
    Config,
    jobs,
    routes,
    services::statistics::StatisticsClient,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "✅ Configuration loaded successfully");

    let state = AppState::from_config(&config)?;
    tracing::info!("✅ AppState initialized");

    let statistics_client = StatisticsClient::new(config.statistics_url.clone())?;

    jobs::spawn_session_sweeper(
        state.auth.clone(),
        Duration::from_secs(config.session_sweep_interval_secs),
    );
    jobs::spawn_statistics_poller(
        statistics_client,
        state.statistics.clone(),
        state.auth.clone(),
        Duration::from_secs(config.statistics_poll_interval_secs),
    );

    let app = routes::create_router(state);

    tracing::info!("🚀 Dashboard listening on http://{}", config.bind_addr);
    tracing::info!(
        "✅ Background session sweep started (every {}s)",
        config.session_sweep_interval_secs
    );
    tracing::info!(
        "✅ Statistics poll started against {} (every {}s)",
        config.statistics_url,
        config.statistics_poll_interval_secs
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
