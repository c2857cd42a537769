use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::MemoryStore;
use crate::batch::BatchManager;

type SharedSweep = Shared<BoxFuture<'static, usize>>;

struct CleanupState {
    last_started: Option<Instant>,
    in_flight: Option<SharedSweep>,
}

/// Periodic TTL sweep over the page store and batch jobs map. Follows the
/// same spawned-ticker-with-`AtomicBool`-shutdown-flag shape as the browser
/// pool's background scaler/keepalive tasks.
pub struct CleanupScheduler {
    store: Arc<MemoryStore>,
    batch: Arc<BatchManager>,
    ttl: Duration,
    min_interval: Duration,
    state: Mutex<CleanupState>,
    shutdown: Arc<AtomicBool>,
}

impl CleanupScheduler {
    pub fn new(store: Arc<MemoryStore>, batch: Arc<BatchManager>, ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            batch,
            ttl,
            min_interval: Duration::from_millis(1000),
            state: Mutex::new(CleanupState {
                last_started: None,
                in_flight: None,
            }),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Re-entrant-safe: a caller that arrives while a sweep is already
    /// running joins that same sweep via a [`Shared`] future and observes
    /// its real result, rather than re-checking `min_interval` against a
    /// lock it only just got to acquire. A call within `min_interval` of
    /// the last *completed* run, with no sweep in flight, is a no-op.
    pub async fn trigger_cleanup(&self) -> usize {
        let mut state = self.state.lock().await;

        if let Some(running) = state.in_flight.clone() {
            drop(state);
            return running.await;
        }

        if let Some(last) = state.last_started
            && last.elapsed() < self.min_interval
        {
            return 0;
        }

        state.last_started = Some(Instant::now());

        let store = self.store.clone();
        let batch = self.batch.clone();
        let ttl = self.ttl;
        let sweep: BoxFuture<'static, usize> = async move {
            let (store_removed, batch_removed) = tokio::join!(
                tokio::task::spawn_blocking(move || store.cleanup_older_than(ttl)),
                tokio::task::spawn_blocking(move || batch.cleanup_older_than(ttl)),
            );
            store_removed.unwrap_or(0) + batch_removed.unwrap_or(0)
        }
        .boxed();
        let shared = sweep.shared();
        state.in_flight = Some(shared.clone());
        drop(state);

        let removed = shared.await;

        let mut state = self.state.lock().await;
        state.in_flight = None;
        drop(state);

        removed
    }

    pub fn spawn_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if this.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let removed = this.trigger_cleanup().await;
                if removed > 0 {
                    tracing::debug!(removed, "cleanup sweep removed expired entries");
                }
            }
        })
    }

    /// Stop the ticker and await any in-flight sweep before returning.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let running = self.state.lock().await.in_flight.clone();
        if let Some(running) = running {
            running.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Pool;
    use crate::config::ServerConfig;
    use crate::scrape::{Engine, FakeBrowserDriver};
    use crate::webhook::WebhookDispatcher;

    fn test_batch_manager() -> Arc<BatchManager> {
        let config = ServerConfig::default();
        let generic = Pool::new("generic", config.max_concurrency, config.max_queue);
        let browser = Pool::new("browser", config.max_browser_concurrency, config.max_browser_queue);
        let driver: Arc<dyn crate::scrape::BrowserDriver> = Arc::new(FakeBrowserDriver::ok(""));
        let engine = Arc::new(Engine::new(&config, generic, browser, driver));
        let webhook = Arc::new(WebhookDispatcher::new(Duration::from_millis(
            config.webhook_timeout_ms,
        )));
        BatchManager::new(engine, webhook, config.default_batch_concurrency)
    }

    #[tokio::test]
    async fn second_call_within_min_interval_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let batch = test_batch_manager();
        let scheduler = CleanupScheduler::new(store, batch, Duration::from_secs(60));

        let first = scheduler.trigger_cleanup().await;
        let second = scheduler.trigger_cleanup().await;
        assert_eq!(first, 0);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn late_caller_observes_the_real_result_of_an_in_flight_sweep() {
        let store = Arc::new(MemoryStore::new());
        let batch = test_batch_manager();
        let scheduler = CleanupScheduler::new(store, batch, Duration::from_secs(60));

        // Prime the scheduler as though a sweep is already running, the way
        // a first caller would leave it mid-flight.
        let sweep: BoxFuture<'static, usize> = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            7
        }
        .boxed();
        let shared = sweep.shared();
        {
            let mut state = scheduler.state.lock().await;
            state.in_flight = Some(shared.clone());
        }

        // A caller arriving while that sweep is in flight must join it and
        // see its real count, not fall through to a synthetic zero.
        let result = scheduler.trigger_cleanup().await;
        assert_eq!(result, 7);
    }
}
