mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use scrape_service::scrape::FakeBrowserDriver;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_ok_when_not_draining() {
    let state = support::test_state(Arc::new(FakeBrowserDriver::ok("")), (1, 1), (1, 1));
    let app = support::router(state);

    let req = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn health_reports_shutting_down_while_draining_and_bypasses_admission_gate() {
    let state = support::test_state(Arc::new(FakeBrowserDriver::ok("")), (1, 1), (1, 1));
    state.shutdown.mark_draining();
    let app = support::router(state);

    let req = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "shutting_down");
    assert!(json.get("activeRequests").is_some());
}

#[tokio::test]
async fn page_requests_are_rejected_while_draining() {
    let state = support::test_state(Arc::new(FakeBrowserDriver::ok("<html><body>hi</body></html>")), (1, 1), (1, 1));
    state.shutdown.mark_draining();
    let app = support::router(state);

    let req = Request::post("/api/v1/page")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"url": "http://x/a", "mode": "browser"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
