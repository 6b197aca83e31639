//! Per-request deadline and cancellation.
//!
//! Every I/O call made by the auth service (repository lookups, revocation
//! list) runs through [`RequestContext::run`]. When the deadline passes or
//! the caller cancels, the in-flight future is dropped and the call fails
//! with `Timeout` / `Cancelled`.

use std::future::Future;

use tokio::sync::watch;
use tokio::time::{Duration, Instant};

use common::{AppError, AppResult};

/// Caller-supplied deadline and cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Handle used to cancel a [`RequestContext`] and all its clones.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone; nothing to signal then.
        let _ = self.tx.send(true);
    }
}

impl RequestContext {
    /// Context without deadline or cancellation.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Attach a cancellation signal.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| d <= Instant::now())
    }

    /// Run `fut` under this context.
    ///
    /// `op` names the operation in the resulting `Timeout` / `Cancelled`
    /// error.
    pub async fn run<F>(&self, op: &str, fut: F) -> AppResult<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(AppError::cancelled(op));
        }
        if self.is_expired() {
            return Err(AppError::timeout(op));
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let cancelled = async {
            let Some(mut rx) = self.cancel.clone() else {
                return std::future::pending::<()>().await;
            };
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without cancelling
                    return std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            output = fut => Ok(output),
            _ = deadline => Err(AppError::timeout(op)),
            _ = cancelled => Err(AppError::cancelled(op)),
        }
    }
}
