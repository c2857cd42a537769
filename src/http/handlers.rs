use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::batch::BatchRequest;
use crate::error::{AppError, AppResult};
use crate::scrape::ScrapeRequest;

use super::state::AppState;

pub async fn page(
    State(state): State<AppState>,
    Extension(ctx): Extension<CancellationToken>,
    Json(req): Json<ScrapeRequest>,
) -> AppResult<Json<crate::scrape::ScrapeResult>> {
    validate_scrape_request(&req)?;

    let result = state.engine.clone().scrape(req.clone(), &ctx).await?;
    state.store.insert(&req, result.clone());

    Ok(Json(result))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchResponse {
    job_id: Uuid,
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<CreateBatchResponse>> {
    let job_id = state.batch.create(req)?;
    Ok(Json(CreateBatchResponse { job_id }))
}

pub async fn batch_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<crate::batch::BatchStatusProjection>> {
    state
        .batch
        .get_status(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("batch job {id} not found")))
}

pub async fn health(State(state): State<AppState>) -> Response {
    if state.shutdown.is_draining() {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "shutting_down",
                "activeRequests": state.shutdown.active(),
                "timestamp": Utc::now(),
            })),
        )
            .into_response()
    } else {
        Json(json!({ "status": "ok" })).into_response()
    }
}

fn validate_scrape_request(req: &ScrapeRequest) -> Result<(), AppError> {
    if req.url.trim().is_empty() {
        return Err(AppError::Validation("url must not be empty".to_string()));
    }
    if let Some(secs) = req.task_timeout_secs
        && secs == 0
    {
        return Err(AppError::Validation(
            "taskTimeoutSecs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
