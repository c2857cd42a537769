use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::FingerprintConfig;
use crate::scrape::Mode;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub url: String,
    #[serde(default)]
    pub mode_override: Option<Mode>,
    #[serde(default)]
    pub raw_body_override: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCommonSettings {
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub raw_body: Option<bool>,
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
    #[serde(default)]
    pub fingerprint: Option<FingerprintConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: std::collections::HashMap<String, String>,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    #[serde(default)]
    pub common_settings: Option<BatchCommonSettings>,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Partial,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Succeeded | BatchStatus::Failed | BatchStatus::Partial
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub url: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<crate::scrape::ScrapeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAttribution {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMeta {
    pub succeeded: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorAttribution>,
}

/// The mutable body of a batch job. Single-writer: only the owning worker
/// loop or the shutdown coordinator ever mutates this, under `job.lock`.
#[derive(Debug)]
pub struct BatchJobState {
    pub status: BatchStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub results: Vec<ItemResult>,
    pub cancel_requested: bool,
    pub accept_results: bool,
    pub finalized: bool,
    pub started_any: bool,
    pub first_error: Option<String>,
    pub status_meta: StatusMeta,
}

/// An in-memory batch job. `request` and `created_at` are immutable after
/// creation; everything else lives behind `state`.
pub struct BatchJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub request: BatchRequest,
    pub state: tokio::sync::Mutex<BatchJobState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusProjection {
    pub job_id: Uuid,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status_meta: StatusMeta,
}

/// Full projection handed to the webhook: status plus `results`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub job_id: Uuid,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status_meta: StatusMeta,
    pub results: Vec<ItemResult>,
}
