//! Batch Job Manager: state machine, pacing worker pool, shutdown
//! finalization. The jobs map is a `DashMap<Uuid, Arc<BatchJob>>`, the same
//! concurrent-map-keyed-by-identifier shape the rate limiter and circuit
//! breaker use.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::fingerprint::FingerprintConfig;
use crate::scrape::{Engine, Mode, ScrapeRequest};
use crate::webhook::WebhookDispatcher;

use super::schedule::delay_ms;
use super::types::{
    BatchCommonSettings, BatchItem, BatchJob, BatchJobState, BatchRequest, BatchStatus,
    BatchStatusProjection, ErrorAttribution, ItemResult, ItemStatus, StatusMeta, WebhookPayload,
};

pub struct BatchManager {
    jobs: DashMap<Uuid, Arc<BatchJob>>,
    engine: Arc<Engine>,
    webhook: Arc<WebhookDispatcher>,
    default_concurrency: usize,
}

impl BatchManager {
    pub fn new(engine: Arc<Engine>, webhook: Arc<WebhookDispatcher>, default_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
            engine,
            webhook,
            default_concurrency,
        })
    }

    /// Validate and create a job, launch its worker loop in the background,
    /// and return its id immediately. The job is observably `queued` until
    /// the spawned task transitions it to `running`.
    pub fn create(self: &Arc<Self>, request: BatchRequest) -> Result<Uuid, AppError> {
        if request.items.is_empty() {
            return Err(AppError::Validation("items must be non-empty".to_string()));
        }
        if request.schedule.min_delay_ms > request.schedule.max_delay_ms {
            return Err(AppError::Validation(
                "schedule.minDelayMs must be <= schedule.maxDelayMs".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let total = request.items.len() as u64;
        let state = BatchJobState {
            status: BatchStatus::Queued,
            completed_at: None,
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
            cancel_requested: false,
            accept_results: true,
            finalized: false,
            started_any: false,
            first_error: None,
            status_meta: StatusMeta::default(),
        };

        let job = Arc::new(BatchJob {
            id,
            created_at: Utc::now(),
            request,
            state: tokio::sync::Mutex::new(state),
        });

        self.jobs.insert(id, job.clone());

        let this = self.clone();
        tokio::spawn(async move {
            this.run_job(job).await;
        });

        Ok(id)
    }

    pub async fn get_status(&self, id: Uuid) -> Option<BatchStatusProjection> {
        let job = self.jobs.get(&id)?.clone();
        let state = job.state.lock().await;
        Some(BatchStatusProjection {
            job_id: job.id,
            status: state.status,
            created_at: job.created_at,
            total: state.total,
            processed: state.processed,
            succeeded: state.succeeded,
            failed: state.failed,
            completed_at: state.completed_at,
            status_meta: state.status_meta.clone(),
        })
    }

    /// Remove every job older than `ttl`, returning the count removed.
    pub fn cleanup_older_than(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or_default();
        let stale: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().created_at <= cutoff)
            .map(|entry| *entry.key())
            .collect();
        for id in &stale {
            self.jobs.remove(id);
        }
        stale.len()
    }

    /// Shutdown finalization: force every non-terminal job to `partial`,
    /// deliver webhooks synchronously, and await all deliveries.
    pub async fn finalize_for_shutdown(&self) {
        let jobs: Vec<Arc<BatchJob>> = self.jobs.iter().map(|e| e.value().clone()).collect();
        let mut deliveries = Vec::new();

        for job in jobs {
            let payload = {
                let mut state = job.state.lock().await;
                if state.status.is_terminal() {
                    continue;
                }
                state.cancel_requested = true;
                state.accept_results = false;
                state.status = BatchStatus::Partial;
                state.status_meta.completed_count = Some(state.processed);
                state.finalized = true;
                state.completed_at = Some(Utc::now());

                job.request.webhook.clone().map(|webhook| {
                    (webhook, build_webhook_payload(&job, &state))
                })
            };

            if let Some((webhook, payload)) = payload {
                let dispatcher = self.webhook.clone();
                deliveries.push(tokio::spawn(async move {
                    if let Err(err) = dispatcher.send(&webhook, &payload).await {
                        tracing::warn!(error = %err, "shutdown webhook delivery failed");
                    }
                }));
            }
        }

        for handle in deliveries {
            let _ = handle.await;
        }
    }

    async fn run_job(self: Arc<Self>, job: Arc<BatchJob>) {
        // Yield once so the initial observable status is `queued`.
        tokio::task::yield_now().await;
        {
            let mut state = job.state.lock().await;
            if state.status == BatchStatus::Queued {
                state.status = BatchStatus::Running;
            }
        }

        let schedule = job.request.schedule.clone();
        let common = job.request.common_settings.clone().unwrap_or_default();
        let concurrency = self.default_concurrency.max(1);
        let next_index = Arc::new(AtomicU64::new(0));
        let ctx = CancellationToken::new();

        let mut workers = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let job = job.clone();
            let next_index = next_index.clone();
            let engine = self.engine.clone();
            let schedule = schedule.clone();
            let common = common.clone();
            let ctx = ctx.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(job, next_index, engine, schedule, common, ctx, concurrency).await;
            }));
        }
        for w in workers {
            let _ = w.await;
        }

        let payload = {
            let mut state = job.state.lock().await;
            if state.finalized {
                return;
            }
            state.status = if state.failed == 0 {
                BatchStatus::Succeeded
            } else if state.succeeded == 0 {
                BatchStatus::Failed
            } else {
                BatchStatus::Partial
            };
            state.completed_at = Some(Utc::now());
            state.status_meta = build_status_meta(&state);
            state.finalized = true;

            job.request
                .webhook
                .clone()
                .map(|webhook| (webhook, build_webhook_payload(&job, &state)))
        };

        if let Some((webhook, payload)) = payload
            && let Err(err) = self.webhook.send(&webhook, &payload).await
        {
            tracing::warn!(error = %err, job_id = %job.id, "webhook delivery failed");
        }
    }
}

async fn worker_loop(
    job: Arc<BatchJob>,
    next_index: Arc<AtomicU64>,
    engine: Arc<Engine>,
    schedule: super::types::ScheduleConfig,
    common: BatchCommonSettings,
    ctx: CancellationToken,
    concurrency: usize,
) {
    loop {
        {
            let state = job.state.lock().await;
            if state.cancel_requested {
                return;
            }
        }

        let i = next_index.fetch_add(1, Ordering::SeqCst);
        if i >= job.request.items.len() as u64 {
            return;
        }

        // The first `concurrency` claims form the initial wave and run
        // without delay; every later claim paces itself.
        if i >= concurrency as u64 {
            let d = delay_ms(schedule.min_delay_ms, schedule.max_delay_ms, schedule.jitter);
            tokio::time::sleep(Duration::from_millis(d)).await;
        }

        let item = job.request.items[i as usize].clone();
        let req = merge_request(&item, &common);

        {
            let mut state = job.state.lock().await;
            state.started_any = true;
        }

        let result = engine.clone().scrape(req, &ctx).await;

        let mut state = job.state.lock().await;
        if !state.accept_results {
            continue;
        }
        match result {
            Ok(scraped) => {
                state.succeeded += 1;
                state.processed += 1;
                state.results.push(ItemResult {
                    url: item.url.clone(),
                    status: ItemStatus::Succeeded,
                    data: Some(scraped),
                    error: None,
                });
            }
            Err(err) => {
                state.failed += 1;
                state.processed += 1;
                if state.first_error.is_none() {
                    state.first_error = Some(err.to_string());
                }
                state.results.push(ItemResult {
                    url: item.url.clone(),
                    status: ItemStatus::Failed,
                    data: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }
}

fn merge_request(item: &BatchItem, common: &BatchCommonSettings) -> ScrapeRequest {
    let fingerprint: Option<FingerprintConfig> = common.fingerprint.clone();
    ScrapeRequest {
        url: item.url.clone(),
        mode: item.mode_override.or(common.mode),
        task_timeout_secs: common.task_timeout_secs,
        raw_body: item.raw_body_override.or(common.raw_body),
        fingerprint,
    }
}

fn build_status_meta(state: &BatchJobState) -> StatusMeta {
    let mut meta = StatusMeta {
        succeeded: state.succeeded,
        failed: state.failed,
        completed_count: None,
        error: None,
    };

    if state.status == BatchStatus::Partial {
        meta.completed_count = Some(state.succeeded + state.failed);
    }

    if state.status == BatchStatus::Failed && state.succeeded == 0 {
        let kind = if !state.started_any { "pre_start" } else { "first_item" };
        let message = state
            .first_error
            .clone()
            .unwrap_or_else(|| "batch failed before completing any item".to_string());
        meta.error = Some(ErrorAttribution {
            kind,
            message: "Failed to extract content from page".to_string(),
            details: Some(message),
        });
    }

    meta
}

fn build_webhook_payload(job: &BatchJob, state: &BatchJobState) -> WebhookPayload {
    WebhookPayload {
        job_id: job.id,
        status: state.status,
        created_at: job.created_at,
        total: state.total,
        processed: state.processed,
        succeeded: state.succeeded,
        failed: state.failed,
        completed_at: state.completed_at,
        status_meta: state.status_meta.clone(),
        results: state.results.clone(),
    }
}
