//! Bounded concurrency admission.
//!
//! Two independent [`Pool`] instances ("generic" and "browser") gate access
//! to scrape work. Each pool enforces `maxConcurrency` in-flight callers and
//! `maxQueue` waiters; once both are saturated, admission fails immediately
//! with [`AppError::Overloaded`] rather than blocking — mirrors the
//! atomic-counter bookkeeping the browser pool here uses for its own
//! in-use tracking.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// A single bounded admission pool.
#[derive(Debug)]
pub struct Pool {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    max_queue: usize,
    queued: AtomicUsize,
}

impl Pool {
    pub fn new(name: &'static str, max_concurrency: usize, max_queue: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            max_queue,
            queued: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrency - self.semaphore.available_permits()
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    /// Admit the caller and run `fut` while holding a slot.
    ///
    /// Fails immediately (never blocks) with `Overloaded` when every
    /// in-flight slot is taken and the queue is already full. Fails with
    /// `Cancelled` if `ctx` is already cancelled or becomes cancelled while
    /// queued, before `fut` ever starts.
    ///
    /// Once admitted, `fut` runs on its own task rather than being polled
    /// in-line: if `ctx` is cancelled while it's running, this returns
    /// `Cancelled` to the caller right away, but the task keeps running to
    /// completion in the background and the slot is held until it actually
    /// returns — cancellation lets the caller stop waiting, it does not
    /// abandon the work.
    pub async fn run<F, T>(&self, ctx: &CancellationToken, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        // Fast path: a permit is available right now, no queueing needed.
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                if self.queued.load(Ordering::SeqCst) >= self.max_queue {
                    tracing::warn!(pool = self.name, "admission refused: pool saturated");
                    return Err(AppError::Overloaded);
                }
                self.queued.fetch_add(1, Ordering::SeqCst);
                let acquired = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => None,
                    permit = self.semaphore.clone().acquire_owned() => Some(permit),
                };
                self.queued.fetch_sub(1, Ordering::SeqCst);
                match acquired {
                    Some(Ok(permit)) => permit,
                    _ => return Err(AppError::Cancelled),
                }
            }
        };

        let mut task = tokio::spawn(fut);
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            result = &mut task => Some(result),
        };

        match outcome {
            None => {
                tokio::spawn(async move {
                    let _ = task.await;
                    drop(permit);
                });
                Err(AppError::Cancelled)
            }
            Some(result) => {
                drop(permit);
                result.map_err(|err| AppError::Internal(format!("admitted task panicked: {err}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn admits_up_to_max_concurrency() {
        let pool = Pool::new("generic", 2, 0);
        let ctx = CancellationToken::new();
        let r = pool.run(&ctx, async { 1 + 1 }).await.unwrap();
        assert_eq!(r, 2);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn refuses_immediately_when_saturated() {
        let pool = Pool::new("generic", 1, 0);
        let ctx = CancellationToken::new();

        let pool2 = pool.clone();
        let holder = tokio::spawn(async move {
            let ctx = CancellationToken::new();
            pool2
                .run(&ctx, async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = pool.run(&ctx, async { 1 }).await.unwrap_err();
        assert!(matches!(err, AppError::Overloaded));

        holder.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn already_cancelled_fails_fast() {
        let pool = Pool::new("generic", 1, 1);
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = pool.run(&ctx, async { 1 }).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_returns_early_but_slot_stays_held_until_task_finishes() {
        let pool = Pool::new("generic", 1, 0);
        let ctx = CancellationToken::new();

        let admitted = pool.clone();
        let run_ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            admitted
                .run(&run_ctx, async {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                })
                .await
        });

        // Cancel while the task is still sleeping.
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(AppError::Cancelled)));

        // The underlying sleep is still running in the background, so the
        // permit must still be held: a fresh call against the full pool is
        // refused rather than admitted.
        let other_ctx = CancellationToken::new();
        let err = pool.run(&other_ctx, async { 1 }).await.unwrap_err();
        assert!(matches!(err, AppError::Overloaded));

        // Once the background sleep actually finishes, the slot frees up.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let r = pool.run(&other_ctx, async { 1 }).await.unwrap();
        assert_eq!(r, 1);
    }
}
