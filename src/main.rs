//! Scrape service entrypoint: loads configuration, wires the core
//! subsystems, and serves the HTTP API until a shutdown signal arrives.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use scrape_service::admission::Pool;
use scrape_service::batch::BatchManager;
use scrape_service::config::ServerConfig;
use scrape_service::http::{self, AppState};
use scrape_service::scrape::{BrowserDriver, ChromiumDriver, Engine};
use scrape_service::shutdown::{self, Coordinator};
use scrape_service::store::{CleanupScheduler, MemoryStore};
use scrape_service::webhook::WebhookDispatcher;
use scrape_service::{BrowserPool, BrowserPoolConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(violations) => {
            for v in &violations {
                tracing::error!(%v, "invalid configuration");
            }
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let browser_pool = BrowserPool::new(BrowserPoolConfig {
        headless: config.playwright_headless,
        ..BrowserPoolConfig::default()
    });
    browser_pool.start().await?;

    let generic_pool = Pool::new("generic", config.max_concurrency, config.max_queue);
    let browser_admission = Pool::new(
        "browser",
        config.max_browser_concurrency,
        config.max_browser_queue,
    );

    let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(browser_pool.clone()));
    let engine = Arc::new(Engine::new(&config, generic_pool, browser_admission, driver));

    let webhook = Arc::new(WebhookDispatcher::new(Duration::from_millis(
        config.webhook_timeout_ms,
    )));
    let batch = BatchManager::new(engine.clone(), webhook, config.default_batch_concurrency);

    let store = Arc::new(MemoryStore::new());
    let cleanup = CleanupScheduler::new(
        store.clone(),
        batch.clone(),
        Duration::from_secs(config.data_lifetime_mins * 60),
    );
    cleanup.spawn_ticker(Duration::from_secs(config.cleanup_interval_mins * 60));

    let shutdown_coordinator = Coordinator::new();

    let state = AppState {
        config: config.clone(),
        engine,
        batch: batch.clone(),
        store,
        shutdown: shutdown_coordinator.clone(),
    };

    let router = http::router(state);
    let addr = format!("{}:{}", config.listen_host, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "scrape service listening");

    let signal_coordinator = shutdown_coordinator.clone();
    let on_shutdown = async move {
        shutdown::wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, draining in-flight requests");
        signal_coordinator.mark_draining();
    };

    let server = axum::serve(listener, router).with_graceful_shutdown(on_shutdown);
    let serve_result = server.await;

    let drained = shutdown_coordinator
        .await_drain(Duration::from_millis(config.app_close_timeout_ms))
        .await;
    if !drained {
        tracing::warn!("drain timed out with requests still active");
    }

    batch.finalize_for_shutdown().await;
    cleanup.shutdown().await;
    if let Err(err) = browser_pool.shutdown().await {
        tracing::warn!(error = %err, "browser pool shutdown error");
    }

    serve_result?;

    if drained {
        Ok(())
    } else {
        anyhow::bail!("shutdown drain timed out")
    }
}
