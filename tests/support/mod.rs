use std::sync::Arc;
use std::time::Duration;

use scrape_service::admission::Pool;
use scrape_service::batch::BatchManager;
use scrape_service::config::ServerConfig;
use scrape_service::http::{self, AppState};
use scrape_service::scrape::{BrowserDriver, Engine};
use scrape_service::shutdown::Coordinator;
use scrape_service::store::MemoryStore;
use scrape_service::webhook::WebhookDispatcher;

/// Build a fully-wired `AppState` for an HTTP-layer test, with pool sizes
/// and the browser driver swappable per test.
pub fn test_state(
    driver: Arc<dyn BrowserDriver>,
    generic_limits: (usize, usize),
    browser_limits: (usize, usize),
) -> AppState {
    test_state_with_batch_concurrency(driver, generic_limits, browser_limits, 2)
}

pub fn test_state_with_batch_concurrency(
    driver: Arc<dyn BrowserDriver>,
    generic_limits: (usize, usize),
    browser_limits: (usize, usize),
    batch_concurrency: usize,
) -> AppState {
    let mut config = ServerConfig::default();
    config.max_concurrency = generic_limits.0;
    config.max_queue = generic_limits.1;
    config.max_browser_concurrency = browser_limits.0;
    config.max_browser_queue = browser_limits.1;
    config.default_batch_concurrency = batch_concurrency;
    let config = Arc::new(config);

    let generic_pool = Pool::new("generic", config.max_concurrency, config.max_queue);
    let browser_pool = Pool::new(
        "browser",
        config.max_browser_concurrency,
        config.max_browser_queue,
    );
    let engine = Arc::new(Engine::new(&config, generic_pool, browser_pool, driver));

    let webhook = Arc::new(WebhookDispatcher::new(Duration::from_secs(5)));
    let batch = BatchManager::new(engine.clone(), webhook, config.default_batch_concurrency);

    AppState {
        config,
        engine,
        batch,
        store: Arc::new(MemoryStore::new()),
        shutdown: Coordinator::new(),
    }
}

pub fn router(state: AppState) -> axum::Router {
    http::router(state)
}
