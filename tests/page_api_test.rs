mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use scrape_service::error::AppError;
use scrape_service::fingerprint::FingerprintBundle;
use scrape_service::scrape::{BrowserDriver, FakeBrowserDriver, PageOptions};
use serde_json::{Value, json};
use tower::ServiceExt;

#[tokio::test]
async fn single_scrape_static_empty_body_succeeds() {
    let driver = Arc::new(FakeBrowserDriver::ok("<html><body></body></html>"));
    let state = support::test_state(driver, (10, 10), (10, 10));
    let app = support::router(state);

    let req = Request::post("/api/v1/page")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"url": "http://x/a", "mode": "browser"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["url"], "http://x/a");
    assert_eq!(json["body"], "");
    assert_eq!(json["meta"]["readTimeMin"], 0);
    assert_eq!(json["meta"]["rawBody"], false);
}

/// A driver that blocks until released, so a test can hold the only
/// admission slot open while a second request is issued.
struct BlockingDriver {
    gate: tokio::sync::Semaphore,
}

#[async_trait]
impl BrowserDriver for BlockingDriver {
    async fn render(
        &self,
        _bundle: &FingerprintBundle,
        _opts: PageOptions<'_>,
        _url: &str,
    ) -> Result<String, AppError> {
        let _permit = self.gate.acquire().await.unwrap();
        Ok("<html><body>hi</body></html>".to_string())
    }
}

#[tokio::test]
async fn overload_returns_503_when_pool_saturated() {
    let driver = Arc::new(BlockingDriver {
        gate: tokio::sync::Semaphore::new(0),
    });
    let state = support::test_state(driver, (1, 0), (1, 0));
    let app = support::router(state);

    let request_body = || {
        Request::post("/api/v1/page")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"url": "http://x/a", "mode": "browser"}).to_string(),
            ))
            .unwrap()
    };

    let app_for_holder = app.clone();
    let holder = tokio::spawn(async move { app_for_holder.oneshot(request_body()).await.unwrap() });

    // Give the held request time to claim the single permit.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = app.clone().oneshot(request_body()).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Release the held request so the test doesn't leak a hung task.
    holder.abort();
}
