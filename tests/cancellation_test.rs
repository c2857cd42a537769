mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scrape_service::error::AppError;
use scrape_service::fingerprint::FingerprintBundle;
use scrape_service::scrape::{BrowserDriver, PageOptions, ScrapeRequest};
use tokio_util::sync::CancellationToken;

/// Never resolves until the token it's given is cancelled, simulating a
/// client disconnect mid-render.
struct HangingDriver;

#[async_trait]
impl BrowserDriver for HangingDriver {
    async fn render(
        &self,
        _bundle: &FingerprintBundle,
        _opts: PageOptions<'_>,
        _url: &str,
    ) -> Result<String, AppError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn client_cancellation_returns_early_but_slot_stays_held_until_work_finishes() {
    let state = support::test_state(Arc::new(HangingDriver), (1, 0), (1, 0));
    let ctx = CancellationToken::new();

    let req = ScrapeRequest {
        url: "http://x/a".to_string(),
        mode: Some(scrape_service::scrape::Mode::Browser),
        task_timeout_secs: Some(1),
        raw_body: None,
        fingerprint: None,
    };

    let engine = state.engine.clone();
    let ctx_for_scrape = ctx.clone();
    let handle = tokio::spawn(async move { engine.scrape(req, &ctx_for_scrape).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    ctx.cancel();

    // The caller stops waiting as soon as cancellation is observed...
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(AppError::Cancelled)));

    // ...but the admitted work is still winding down in the background (it
    // only resolves once its own task timeout elapses), so the slot must
    // still be held immediately after cancellation.
    let probe = ScrapeRequest {
        url: "http://x/b".to_string(),
        mode: Some(scrape_service::scrape::Mode::Browser),
        task_timeout_secs: Some(1),
        raw_body: None,
        fingerprint: None,
    };
    let probe_ctx = CancellationToken::new();
    let probe_outcome = state.engine.clone().scrape(probe, &probe_ctx).await;
    assert!(matches!(probe_outcome, Err(AppError::Overloaded)));

    // Once the first call's own task timeout has actually elapsed, the slot
    // is freed and a follow-up request is admitted again.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let follow_up = ScrapeRequest {
        url: "http://x/c".to_string(),
        mode: Some(scrape_service::scrape::Mode::Browser),
        task_timeout_secs: Some(1),
        raw_body: None,
        fingerprint: None,
    };
    let ctx2 = CancellationToken::new();
    let outcome = state.engine.clone().scrape(follow_up, &ctx2).await;
    assert!(!matches!(outcome, Err(AppError::Overloaded)));
}
