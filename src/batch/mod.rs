//! Batch Job Manager: state machine, pacing worker pool, per-item
//! execution, shutdown finalization.

mod manager;
mod schedule;
mod types;

pub use manager::BatchManager;
pub use types::{
    BatchCommonSettings, BatchItem, BatchJob, BatchRequest, BatchStatus, BatchStatusProjection,
    ErrorAttribution, ItemResult, ItemStatus, ScheduleConfig, StatusMeta, WebhookConfig,
    WebhookPayload,
};
