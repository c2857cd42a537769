//! Webhook Dispatcher: single-shot delivery with bounded retries,
//! exponential backoff + jitter, per-attempt timeout.

use std::time::Duration;

use rand::Rng;

use crate::batch::{WebhookConfig, WebhookPayload};
use crate::error::AppError;

const SERVICE_USER_AGENT: &str = concat!("scrape-service/", env!("CARGO_PKG_VERSION"));

pub struct WebhookDispatcher {
    client: reqwest::Client,
    attempt_timeout: Duration,
}

impl WebhookDispatcher {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            attempt_timeout,
        }
    }

    /// Deliver `payload` to `cfg.url`, retrying up to `cfg.maxAttempts`
    /// times with exponential backoff + 10% positive jitter between
    /// attempts. At-most-once: on final failure, the error is returned for
    /// the caller to log and discard.
    pub async fn send(&self, cfg: &WebhookConfig, payload: &WebhookPayload) -> Result<(), AppError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(format!("failed to serialize webhook payload: {e}")))?;

        let mut last_err = None;

        for attempt in 1..=cfg.max_attempts.max(1) {
            if attempt >= 2 {
                let base = cfg.backoff_ms * 2u64.pow(attempt - 2);
                let jitter = {
                    let mut rng = rand::rng();
                    rng.random_range(0.0..=0.1) * base as f64
                };
                tokio::time::sleep(Duration::from_millis(base + jitter.round() as u64)).await;
            }

            let mut req = self
                .client
                .post(&cfg.url)
                .timeout(self.attempt_timeout)
                .header("Content-Type", "application/json")
                .header("User-Agent", SERVICE_USER_AGENT)
                .body(body.clone());

            // Caller-supplied headers win over the defaults above.
            for (k, v) in &cfg.headers {
                req = req.header(k.as_str(), v.as_str());
            }

            match req.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    last_err = Some(format!("webhook responded with status {}", resp.status()));
                }
                Err(err) => {
                    last_err = Some(err.to_string());
                }
            }
        }

        let message = last_err.unwrap_or_else(|| "webhook delivery failed".to_string());
        tracing::warn!(url = %cfg.url, error = %message, "webhook delivery exhausted retries");
        Err(AppError::Internal(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            job_id: uuid::Uuid::new_v4(),
            status: crate::batch::BatchStatus::Succeeded,
            created_at: chrono::Utc::now(),
            total: 1,
            processed: 1,
            succeeded: 1,
            failed: 0,
            completed_at: Some(chrono::Utc::now()),
            status_meta: Default::default(),
            results: vec![],
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_2xx_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new(Duration::from_secs(5));
        let cfg = WebhookConfig {
            url: format!("{}/hook", server.url()),
            headers: HashMap::new(),
            max_attempts: 3,
            backoff_ms: 10,
        };

        dispatcher.send(&cfg, &payload()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new(Duration::from_secs(5));
        let cfg = WebhookConfig {
            url: format!("{}/hook", server.url()),
            headers: HashMap::new(),
            max_attempts: 3,
            backoff_ms: 1,
        };

        let result = dispatcher.send(&cfg, &payload()).await;
        assert!(result.is_err());
        mock.assert_async().await;
    }
}
