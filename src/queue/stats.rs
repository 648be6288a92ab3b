use super::operation::OperationPriority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time counters of a queue. Observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Enqueued and not yet started
    pub pending: usize,
    /// Currently executing, including items waiting out a retry delay
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Whether the processing loop is running
    pub is_processing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Bookkeeping kept for an operation after it reached a terminal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub name: String,
    pub priority: OperationPriority,
    pub status: OperationStatus,
    pub attempts: u32,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// An operation currently holding a concurrency slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InFlightOperation {
    pub id: String,
    pub name: String,
    pub priority: OperationPriority,
    pub attempt_count: u32,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

/// Options for `PriorityRetryQueue::cleanup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Reject every not-yet-started operation with `PriorisError::Cancelled`
    pub cancel_pending: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            cancel_pending: true,
        }
    }
}

/// What a `cleanup` call removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Pending operations rejected with `PriorisError::Cancelled`
    pub cancelled: usize,
    /// Terminal records dropped from the history
    pub pruned: usize,
}
