//! Bound on concurrently running engine processes.
//!
//! Requests beyond the bound wait up to `queue_timeout` for a slot, then fail
//! with `Overloaded`. A zero `queue_timeout` fails fast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::engine::{EngineError, Stage};

#[derive(Clone)]
pub struct EngineLimiter {
    permits: Arc<Semaphore>,
    bound: usize,
    queue_timeout: Duration,
}

impl EngineLimiter {
    pub fn new(bound: usize, queue_timeout: Duration) -> Self {
        let bound = bound.max(1);
        Self {
            permits: Arc::new(Semaphore::new(bound)),
            bound,
            queue_timeout,
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a slot. The permit frees the slot when dropped.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit, EngineError> {
        let overloaded = EngineError::Overloaded { bound: self.bound };

        if self.queue_timeout.is_zero() {
            return Arc::clone(&self.permits).try_acquire_owned().map_err(|_| {
                warn!("Engine limiter full ({} slots), rejecting", self.bound);
                overloaded
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled { stage: Stage::Queue }),
            acquired = tokio::time::timeout(
                self.queue_timeout,
                Arc::clone(&self.permits).acquire_owned(),
            ) => match acquired {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_closed)) => Err(overloaded),
                Err(_elapsed) => {
                    warn!(
                        "No engine slot freed within {}ms ({} slots)",
                        self.queue_timeout.as_millis(),
                        self.bound
                    );
                    Err(overloaded)
                }
            },
        }
    }
}
