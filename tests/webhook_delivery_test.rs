mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use scrape_service::scrape::FakeBrowserDriver;
use serde_json::{Value, json};
use tower::ServiceExt;

#[tokio::test]
async fn batch_completion_delivers_webhook_exactly_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let driver = Arc::new(FakeBrowserDriver::ok("<html><body><p>hi</p></body></html>"));
    let state = support::test_state(driver, (10, 10), (10, 10));
    let app = support::router(state);

    let req = Request::post("/api/v1/batch")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "items": [{"url": "http://x/1", "mode": "browser"}],
                "schedule": {"minDelayMs": 0, "maxDelayMs": 0},
                "webhook": {"url": format!("{}/hook", server.url()), "maxAttempts": 3, "backoffMs": 10},
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: Value = serde_json::from_slice(&bytes).unwrap();
    let job_id = created["jobId"].as_str().unwrap().to_string();

    // Give the background job time to finish and fire its webhook.
    for _ in 0..50 {
        let req = Request::get(format!("/api/v1/batch/{job_id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: Value = serde_json::from_slice(&bytes).unwrap();
        if status["status"] == "succeeded" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Webhook delivery is fire-and-forget after the job completes; give it
    // a moment to land before asserting the mock was hit exactly once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    mock.assert_async().await;
}
