//! Retry state machine for a single (competitor, SKU) fetch

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::transport::PageSnapshot;

/// Linear backoff over a fixed number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts, the first one included
    pub max_attempts: u32,
    /// Retry `n` waits `n * base_delay`
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }

    /// Transition out of a failed `Fetching { attempt }`
    pub fn after_failure(&self, attempt: u32, error: FetchError) -> TaskState {
        if error.is_transient() && attempt < self.max_attempts {
            TaskState::Retrying {
                attempt,
                delay: self.backoff(attempt),
            }
        } else {
            TaskState::Failed(error)
        }
    }
}

/// `Pending → Fetching(n) → Retrying(n) → Fetching(n + 1) … → Fetched | Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Fetching { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Fetched(PageSnapshot),
    Failed(FetchError),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fetched(_) | Self::Failed(_))
    }
}

/// Delay abstraction so pacing and backoff can be exercised without real time
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
