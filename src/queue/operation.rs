use super::job::Job;
use crate::core::{PriorisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

/// Sequence appended to generated ids so two operations with the same
/// name in the same millisecond still differ.
static NEXT_OPERATION_SEQ: AtomicU64 = AtomicU64::new(1);

pub(crate) fn generate_operation_id(name: &str) -> String {
    let seq = NEXT_OPERATION_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", name, Utc::now().timestamp_millis(), seq)
}

/// Scheduling priority, ordered `Low < Medium < High < Critical`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl fmt::Display for OperationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationPriority::Low => "low",
            OperationPriority::Medium => "medium",
            OperationPriority::High => "high",
            OperationPriority::Critical => "critical",
        };
        write!(f, "{label}")
    }
}

/// Per-operation options for `PriorityRetryQueue::enqueue`
///
/// Unset retry fields fall back to the queue's `QueueConfig` defaults.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub id: Option<String>,
    pub priority: OperationPriority,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl EnqueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(priority: OperationPriority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn priority(mut self, priority: OperationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

/// A pending unit of work owned by the queue
pub(crate) struct QueuedOperation {
    /// Queue-internal key; caller ids are not required to be unique
    pub ticket: u64,
    pub id: String,
    pub name: String,
    pub priority: OperationPriority,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub scheduled_at: DateTime<Utc>,
    pub job: Box<dyn Job>,
}

/// Future resolving to the final outcome of an enqueued operation.
///
/// Resolves exactly once: with the operation's value, with
/// `PriorisError::RetriesExhausted` carrying the last failure, or with
/// `PriorisError::Cancelled` if the operation was cancelled before it
/// started.
#[must_use = "the outcome of a queued operation is only observable through this future"]
pub struct QueuedResult<T> {
    id: String,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> QueuedResult<T> {
    pub(crate) fn new(id: String, receiver: oneshot::Receiver<Result<T>>) -> Self {
        Self { id, receiver }
    }

    /// Identifier of the operation this future belongs to
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> Future for QueuedResult<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(PriorisError::Internal(format!(
                "operation '{}' ended without producing a result",
                this.id
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(OperationPriority::Low < OperationPriority::Medium);
        assert!(OperationPriority::Medium < OperationPriority::High);
        assert!(OperationPriority::High < OperationPriority::Critical);
        assert_eq!(OperationPriority::default(), OperationPriority::Medium);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_operation_id("sync");
        let b = generate_operation_id("sync");
        assert!(a.starts_with("sync_"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_to_internal_error() {
        let (sender, receiver) = oneshot::channel::<Result<u32>>();
        drop(sender);
        let result = QueuedResult::new("op".into(), receiver).await;
        assert!(matches!(result, Err(PriorisError::Internal(_))));
    }
}
