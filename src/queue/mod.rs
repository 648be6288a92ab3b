// ============================================================================
// Priority Retry Queue
// ============================================================================
//
// Runs named asynchronous operations under a concurrency cap.
//
// - Pending operations are kept ordered by descending priority, FIFO within
//   a priority (insertion after the last item of equal or higher priority).
// - One driver task pulls from the head while fewer than
//   `max_concurrent_operations` are in flight. It exits when nothing is
//   pending or in flight and is spawned again by the next `enqueue`.
// - A failed attempt is retried after a fixed delay while
//   `attempt_count <= max_retries`. Retries stay in the slot they started
//   in; they never go back through the pending list.
// - Cancellation only reaches operations that have not started.
//
// All bookkeeping sits behind one mutex that is never held across an
// `.await`.
//
// ============================================================================

mod job;
pub mod operation;
pub mod stats;

pub use operation::{EnqueueOptions, OperationPriority, QueuedResult};
pub use stats::{
    CleanupOptions, CleanupReport, InFlightOperation, OperationRecord, OperationStatus, QueueStats,
};

use crate::config::QueueConfig;
use crate::core::{BoxError, PriorisError, Result};
use crate::observability::{LoggingSink, TracingSink};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use job::{Job, RunContext, RunReport, TypedJob};
use operation::{QueuedOperation, generate_operation_id};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};

const LOG_CONTEXT: &str = "PriorityRetryQueue";

/// Priority-ordered, bounded-concurrency queue with fixed-delay retries
#[derive(Clone)]
pub struct PriorityRetryQueue {
    shared: Arc<Shared>,
}

struct Shared {
    config: QueueConfig,
    sink: Arc<dyn LoggingSink>,
    state: Mutex<QueueState>,
    /// Wakes the driver when work is added or a slot frees up
    wake: Notify,
    /// Signalled when the driver goes idle
    idle: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        // Nothing panics while holding this lock; recover the data if it did.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct InFlightEntry {
    id: String,
    name: String,
    priority: OperationPriority,
    scheduled_at: DateTime<Utc>,
    started_at: DateTime<Utc>,
    attempts: Arc<AtomicU32>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedOperation>,
    in_flight: HashMap<u64, InFlightEntry>,
    history: VecDeque<OperationRecord>,
    completed: u64,
    failed: u64,
    cancelled: u64,
    processing: bool,
    next_ticket: u64,
}

impl QueueState {
    fn insert_by_priority(&mut self, operation: QueuedOperation) {
        let index = self
            .pending
            .iter()
            .position(|queued| queued.priority < operation.priority)
            .unwrap_or(self.pending.len());
        self.pending.insert(index, operation);
    }

    fn record(&mut self, record: OperationRecord, max_history: usize) {
        match record.status {
            OperationStatus::Completed => self.completed += 1,
            OperationStatus::Failed => self.failed += 1,
            OperationStatus::Cancelled => self.cancelled += 1,
        }
        if max_history == 0 {
            return;
        }
        while self.history.len() >= max_history {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

enum Step {
    Start(QueuedOperation, Arc<AtomicU32>, DateTime<Utc>),
    Wait,
    Idle,
}

impl PriorityRetryQueue {
    /// Create a queue reporting attempt failures through `tracing`.
    pub fn new(config: QueueConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: QueueConfig, sink: Arc<dyn LoggingSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                sink,
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                idle: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Schedule `operation` and return a future for its final outcome.
    ///
    /// Never blocks. `operation` is called once per attempt, so it must be
    /// able to produce a fresh future each time. Must be called from within
    /// a Tokio runtime; otherwise the returned future resolves to
    /// `PriorisError::Internal` immediately.
    pub fn enqueue<T, F, Fut, E>(
        &self,
        name: impl Into<String>,
        operation: F,
        options: EnqueueOptions,
    ) -> QueuedResult<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let name = name.into();
        let id = options
            .id
            .clone()
            .unwrap_or_else(|| generate_operation_id(&name));
        let (sender, receiver) = oneshot::channel();
        let job = Box::new(TypedJob::new(operation, sender));

        let Ok(runtime) = Handle::try_current() else {
            job.reject(PriorisError::Internal(format!(
                "operation '{}' was enqueued outside a Tokio runtime",
                name
            )));
            return QueuedResult::new(id, receiver);
        };

        let operation = QueuedOperation {
            ticket: 0,
            id: id.clone(),
            name: name.clone(),
            priority: options.priority,
            max_retries: options
                .max_retries
                .unwrap_or(self.shared.config.default_max_retries),
            retry_delay: options
                .retry_delay
                .unwrap_or(self.shared.config.default_retry_delay),
            scheduled_at: Utc::now(),
            job,
        };
        let priority = operation.priority;

        let (spawn_driver, pending) = {
            let mut state = self.shared.state();
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            state.insert_by_priority(QueuedOperation { ticket, ..operation });

            let spawn_driver = !state.processing;
            state.processing = true;
            (spawn_driver, state.pending.len())
        };

        self.shared.sink.debug(
            "Operation enqueued",
            LOG_CONTEXT,
            Some(&json!({
                "id": id,
                "name": name,
                "priority": priority.to_string(),
                "pending": pending,
            })),
        );

        if spawn_driver {
            runtime.spawn(drive(self.shared.clone()));
        } else {
            self.shared.wake.notify_one();
        }

        QueuedResult::new(id, receiver)
    }

    /// Reject every not-yet-started operation with `PriorisError::Cancelled`.
    ///
    /// In-flight operations keep running. Returns the number cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled: Vec<QueuedOperation> = {
            let mut state = self.shared.state();
            let drained: Vec<QueuedOperation> = state.pending.drain(..).collect();
            let now = Utc::now();
            let max_history = self.shared.config.max_history;
            for operation in &drained {
                state.record(
                    OperationRecord {
                        id: operation.id.clone(),
                        name: operation.name.clone(),
                        priority: operation.priority,
                        status: OperationStatus::Cancelled,
                        attempts: 0,
                        scheduled_at: operation.scheduled_at,
                        started_at: None,
                        completed_at: now,
                        error: None,
                    },
                    max_history,
                );
            }
            drained
        };

        let count = cancelled.len();
        for operation in cancelled {
            let QueuedOperation { id, name, job, .. } = operation;
            job.reject(PriorisError::Cancelled { id, name });
        }

        if count > 0 {
            self.shared.sink.info(
                "Pending operations cancelled",
                LOG_CONTEXT,
                Some(&json!({ "cancelled": count })),
            );
            // Let an idle-waiting driver notice the empty queue.
            self.shared.wake.notify_one();
        }
        count
    }

    /// Prune terminal bookkeeping, optionally cancelling pending operations
    /// first. In-flight operations are never interrupted.
    pub fn cleanup(&self, options: CleanupOptions) -> CleanupReport {
        let cancelled = if options.cancel_pending {
            self.cancel_all()
        } else {
            0
        };

        let pruned = {
            let mut state = self.shared.state();
            let pruned = state.history.len();
            state.history.clear();
            state.completed = 0;
            state.failed = 0;
            state.cancelled = 0;
            pruned
        };

        CleanupReport { cancelled, pruned }
    }

    pub fn statistics(&self) -> QueueStats {
        let state = self.shared.state();
        QueueStats {
            pending: state.pending.len(),
            in_flight: state.in_flight.len(),
            completed: state.completed,
            failed: state.failed,
            cancelled: state.cancelled,
            is_processing: state.processing,
        }
    }

    /// Ids of pending operations in dispatch order
    pub fn pending_ids(&self) -> Vec<String> {
        self.shared
            .state()
            .pending
            .iter()
            .map(|operation| operation.id.clone())
            .collect()
    }

    /// Operations currently holding a slot, oldest first
    pub fn in_flight(&self) -> Vec<InFlightOperation> {
        let state = self.shared.state();
        let mut entries: Vec<InFlightOperation> = state
            .in_flight
            .values()
            .map(|entry| InFlightOperation {
                id: entry.id.clone(),
                name: entry.name.clone(),
                priority: entry.priority,
                attempt_count: entry.attempts.load(Ordering::SeqCst),
                scheduled_at: entry.scheduled_at,
                started_at: entry.started_at,
            })
            .collect();
        entries.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        entries
    }

    /// Retained terminal records, oldest first
    pub fn history(&self) -> Vec<OperationRecord> {
        self.shared.state().history.iter().cloned().collect()
    }

    /// Wait until nothing is pending or in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.shared.state().processing {
                return;
            }
            notified.await;
        }
    }
}

async fn drive(shared: Arc<Shared>) {
    loop {
        let step = {
            let mut state = shared.state();
            if state.pending.is_empty() && state.in_flight.is_empty() {
                state.processing = false;
                Step::Idle
            } else if state.in_flight.len() < shared.config.max_concurrent_operations {
                match state.pending.pop_front() {
                    Some(operation) => {
                        let attempts = Arc::new(AtomicU32::new(0));
                        let started_at = Utc::now();
                        state.in_flight.insert(
                            operation.ticket,
                            InFlightEntry {
                                id: operation.id.clone(),
                                name: operation.name.clone(),
                                priority: operation.priority,
                                scheduled_at: operation.scheduled_at,
                                started_at,
                                attempts: attempts.clone(),
                            },
                        );
                        Step::Start(operation, attempts, started_at)
                    }
                    None => Step::Wait,
                }
            } else {
                Step::Wait
            }
        };

        match step {
            Step::Start(operation, attempts, started_at) => {
                tokio::spawn(execute(shared.clone(), operation, attempts, started_at));
            }
            Step::Wait => shared.wake.notified().await,
            Step::Idle => {
                shared.idle.notify_waiters();
                return;
            }
        }
    }
}

async fn execute(
    shared: Arc<Shared>,
    operation: QueuedOperation,
    attempts: Arc<AtomicU32>,
    started_at: DateTime<Utc>,
) {
    let QueuedOperation {
        ticket,
        id,
        name,
        priority,
        max_retries,
        retry_delay,
        scheduled_at,
        job,
    } = operation;

    let ctx = RunContext {
        id: id.clone(),
        name: name.clone(),
        priority,
        max_retries,
        retry_delay,
        attempts: attempts.clone(),
        sink: shared.sink.clone(),
    };

    let report = match AssertUnwindSafe(job.run(ctx)).catch_unwind().await {
        Ok(report) => report,
        Err(_) => {
            shared.sink.error(
                "Operation panicked",
                LOG_CONTEXT,
                Some(&json!({ "id": id, "name": name })),
            );
            RunReport {
                succeeded: false,
                attempts: attempts.load(Ordering::SeqCst),
                error: Some("operation panicked".to_string()),
            }
        }
    };

    let record = OperationRecord {
        id,
        name,
        priority,
        status: if report.succeeded {
            OperationStatus::Completed
        } else {
            OperationStatus::Failed
        },
        attempts: report.attempts,
        scheduled_at,
        started_at: Some(started_at),
        completed_at: Utc::now(),
        error: report.error,
    };

    {
        let mut state = shared.state();
        state.in_flight.remove(&ticket);
        state.record(record, shared.config.max_history);
    }
    shared.wake.notify_one();
}
