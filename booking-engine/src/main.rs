use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use booking_engine::config::AppConfig;
use booking_engine::engine::Engine;
use booking_engine::page::WebDriverFactory;
use booking_engine::schedule::{CacheConfig, CachedScheduleClient, RailRadarClient};
use booking_engine::web::{AppState, create_router};

/// How often parked runs touch their page so the site session survives.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(4 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("booking_engine=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    if config.credentials.is_none() {
        warn!("IRCTC_USERNAME/IRCTC_PASSWORD not set; runs will stop at sign-in");
    }

    let table = config
        .selector_table()
        .expect("Failed to load selector table");
    info!(targets = table.len(), "selector table loaded");

    let factory = WebDriverFactory::new(config.webdriver.clone());
    let mut engine = Engine::new(factory, config.engine_config(), table);

    match &config.schedule {
        Some(schedule_config) => {
            let client =
                RailRadarClient::new(schedule_config.clone()).expect("Failed to create schedule client");
            let cached = CachedScheduleClient::new(client, &CacheConfig::default());
            engine = engine.with_schedule(Arc::new(cached));
            info!("schedule cross-check enabled");
        }
        None => info!("RAILRADAR_API_KEY not set; schedule cross-check disabled"),
    }

    let engine = Arc::new(engine);

    let keep_alive = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(KEEP_ALIVE_INTERVAL);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            let reached = keep_alive.keep_alive().await;
            if reached > 0 {
                info!(runs = reached, "kept parked sessions alive");
            }
        }
    });

    let app = create_router(AppState::new(engine));

    let addr = config.bind_addr;
    info!(%addr, "booking engine listening");
    info!("  GET    /health              - Health check");
    info!("  GET    /runs                - List runs");
    info!("  POST   /runs                - Start a run");
    info!("  GET    /runs/:id            - Run status");
    info!("  POST   /runs/:id/resume     - Answer a suspension");
    info!("  POST   /runs/:id/refresh    - Check for confirmation");
    info!("  DELETE /runs/:id            - Close a run");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
