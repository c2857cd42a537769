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

async fn create_batch(app: &axum::Router, body: Value) -> Value {
    let req = Request::post("/api/v1/batch")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn poll_status(app: &axum::Router, job_id: &str) -> Value {
    for _ in 0..100 {
        let req = Request::get(format!("/api/v1/batch/{job_id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: Value = serde_json::from_slice(&bytes).unwrap();
        if status["status"] != "queued" && status["status"] != "running" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("batch job {job_id} never reached a terminal status");
}

#[tokio::test]
async fn batch_happy_path_both_items_succeed() {
    let driver = Arc::new(FakeBrowserDriver::ok("<html><body><p>hi</p></body></html>"));
    let state = support::test_state(driver, (10, 10), (10, 10));
    let app = support::router(state);

    let created = create_batch(
        &app,
        json!({
            "items": [{"url": "http://x/1"}, {"url": "http://x/2"}],
            "commonSettings": {"mode": "browser"},
            "schedule": {"minDelayMs": 0, "maxDelayMs": 0},
        }),
    )
    .await;
    let job_id = created["jobId"].as_str().unwrap().to_string();

    let status = poll_status(&app, &job_id).await;
    assert_eq!(status["status"], "succeeded");
    assert_eq!(status["total"], 2);
    assert_eq!(status["processed"], 2);
    assert_eq!(status["succeeded"], 2);
    assert_eq!(status["failed"], 0);
    assert_eq!(status["statusMeta"]["succeeded"], 2);
    assert_eq!(status["statusMeta"]["failed"], 0);
}

/// Fails on every other URL so one item succeeds and one fails.
struct AlternatingDriver;

#[async_trait]
impl BrowserDriver for AlternatingDriver {
    async fn render(
        &self,
        _bundle: &FingerprintBundle,
        _opts: PageOptions<'_>,
        url: &str,
    ) -> Result<String, AppError> {
        if url.ends_with('1') {
            Err(AppError::Browser("Boom".to_string()))
        } else {
            Ok("<html><body><p>hi</p></body></html>".to_string())
        }
    }
}

#[tokio::test]
async fn batch_partial_when_one_item_fails() {
    let state = support::test_state(Arc::new(AlternatingDriver), (10, 10), (10, 10));
    let app = support::router(state);

    let created = create_batch(
        &app,
        json!({
            "items": [{"url": "http://x/1", "mode": "browser"}, {"url": "http://x/2", "mode": "browser"}],
            "schedule": {"minDelayMs": 0, "maxDelayMs": 0},
        }),
    )
    .await;
    let job_id = created["jobId"].as_str().unwrap().to_string();

    let status = poll_status(&app, &job_id).await;
    assert_eq!(status["status"], "partial");
    assert_eq!(status["statusMeta"]["succeeded"], 1);
    assert_eq!(status["statusMeta"]["failed"], 1);
    assert_eq!(status["statusMeta"]["completedCount"], 2);
}

/// Always fails with the same message, for the all-fail attribution case.
struct AlwaysFailsDriver;

#[async_trait]
impl BrowserDriver for AlwaysFailsDriver {
    async fn render(
        &self,
        _bundle: &FingerprintBundle,
        _opts: PageOptions<'_>,
        _url: &str,
    ) -> Result<String, AppError> {
        Err(AppError::Browser("Boom".to_string()))
    }
}

#[tokio::test]
async fn batch_all_fail_attributes_first_item_error() {
    let state = support::test_state(Arc::new(AlwaysFailsDriver), (10, 10), (10, 10));
    let app = support::router(state);

    let created = create_batch(
        &app,
        json!({
            "items": [{"url": "http://x/1", "mode": "browser"}, {"url": "http://x/2", "mode": "browser"}],
            "schedule": {"minDelayMs": 0, "maxDelayMs": 0},
        }),
    )
    .await;
    let job_id = created["jobId"].as_str().unwrap().to_string();

    let status = poll_status(&app, &job_id).await;
    assert_eq!(status["status"], "failed");
    assert_eq!(status["statusMeta"]["error"]["kind"], "first_item");
    assert_eq!(
        status["statusMeta"]["error"]["message"],
        "Failed to extract content from page"
    );
    assert!(
        status["statusMeta"]["error"]["details"]
            .as_str()
            .unwrap()
            .contains("Boom")
    );
}

#[tokio::test]
async fn shutdown_finalizes_in_flight_batch_as_partial() {
    let driver = Arc::new(FakeBrowserDriver::ok("<html><body><p>hi</p></body></html>"));
    let state = support::test_state_with_batch_concurrency(driver, (10, 10), (10, 10), 1);
    let batch = state.batch.clone();
    let app = support::router(state);

    // Single-worker concurrency + a large inter-item delay keeps the job
    // running long enough for shutdown to observe it mid-flight.
    let created = create_batch(
        &app,
        json!({
            "items": [{"url": "http://x/1", "mode": "browser"}, {"url": "http://x/2", "mode": "browser"}],
            "schedule": {"minDelayMs": 5000, "maxDelayMs": 5000, "jitter": false},
        }),
    )
    .await;
    let job_id = created["jobId"].as_str().unwrap().to_string();

    // Let the first item complete before forcing shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    batch.finalize_for_shutdown().await;

    let status = poll_status(&app, &job_id).await;
    assert_eq!(status["status"], "partial");
    assert_eq!(status["statusMeta"]["completedCount"], 1);
}
