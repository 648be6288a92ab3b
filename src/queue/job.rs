// Type-erased work item. The generic `TypedJob` owns the caller's closure
// and the result sender; the queue only sees `Box<dyn Job>`.

use super::operation::OperationPriority;
use crate::core::{BoxError, PriorisError, Result};
use crate::observability::LoggingSink;
use futures::future::BoxFuture;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

const LOG_CONTEXT: &str = "PriorityRetryQueue";

/// Everything the retry loop needs besides the job itself
pub(crate) struct RunContext {
    pub id: String,
    pub name: String,
    pub priority: OperationPriority,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Shared with the queue's in-flight table for statistics
    pub attempts: Arc<AtomicU32>,
    pub sink: Arc<dyn LoggingSink>,
}

/// Terminal outcome of a job, without the value
pub(crate) struct RunReport {
    pub succeeded: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

pub(crate) trait Job: Send {
    /// Run attempts until success or exhaustion and resolve the caller.
    fn run(self: Box<Self>, ctx: RunContext) -> BoxFuture<'static, RunReport>;

    /// Resolve the caller with `error` without running the work.
    fn reject(self: Box<Self>, error: PriorisError);
}

pub(crate) struct TypedJob<T, F> {
    work: F,
    sender: oneshot::Sender<Result<T>>,
}

impl<T, F> TypedJob<T, F> {
    pub fn new(work: F, sender: oneshot::Sender<Result<T>>) -> Self {
        Self { work, sender }
    }
}

impl<T, F, Fut, E> Job for TypedJob<T, F>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    fn run(self: Box<Self>, ctx: RunContext) -> BoxFuture<'static, RunReport> {
        let TypedJob { mut work, sender } = *self;
        Box::pin(async move {
            let source: BoxError = loop {
                // Counted before the attempt starts, including the first.
                let attempt = ctx.attempts.fetch_add(1, Ordering::SeqCst) + 1;

                let err: BoxError = match work().await {
                    Ok(value) => {
                        if attempt > 1 {
                            ctx.sink.info(
                                "Operation succeeded after retry",
                                LOG_CONTEXT,
                                Some(&json!({
                                    "id": ctx.id,
                                    "name": ctx.name,
                                    "attempts": attempt,
                                })),
                            );
                        }
                        // The caller may have stopped listening; that is fine.
                        let _ = sender.send(Ok(value));
                        return RunReport {
                            succeeded: true,
                            attempts: attempt,
                            error: None,
                        };
                    }
                    Err(err) => err.into(),
                };

                let data = json!({
                    "id": ctx.id,
                    "name": ctx.name,
                    "priority": ctx.priority.to_string(),
                    "attempt": attempt,
                    "max_retries": ctx.max_retries,
                    "error": err.to_string(),
                });

                if attempt > ctx.max_retries {
                    ctx.sink.error("Operation failed, retries exhausted", LOG_CONTEXT, Some(&data));
                    break err;
                }

                ctx.sink.warning("Operation attempt failed, retrying", LOG_CONTEXT, Some(&data));
                tokio::time::sleep(ctx.retry_delay).await;
            };

            let attempts = ctx.attempts.load(Ordering::SeqCst);
            let message = source.to_string();
            let _ = sender.send(Err(PriorisError::RetriesExhausted {
                name: ctx.name.clone(),
                attempts,
                source,
            }));

            RunReport {
                succeeded: false,
                attempts,
                error: Some(message),
            }
        })
    }

    fn reject(self: Box<Self>, error: PriorisError) {
        let _ = self.sender.send(Err(error));
    }
}
