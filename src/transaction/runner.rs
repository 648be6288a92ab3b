use crate::core::Result;
use crate::observability::{LoggingSink, TracingSink};
use log::warn;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const LOG_CONTEXT: &str = "CompensatingTransactionRunner";

/// Counters of a runner since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub committed: u64,
    pub rolled_back: u64,
    pub compensation_failures: u64,
}

/// Runs a forward action and, if it fails, its compensating action.
///
/// The caller always receives the forward action's own error. A failing
/// compensation is logged and counted but never replaces that error.
pub struct CompensatingTransactionRunner {
    sink: Arc<dyn LoggingSink>,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    compensation_failures: AtomicU64,
}

impl Default for CompensatingTransactionRunner {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl CompensatingTransactionRunner {
    pub fn new(sink: Arc<dyn LoggingSink>) -> Self {
        Self {
            sink,
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
            compensation_failures: AtomicU64::new(0),
        }
    }

    /// Run `forward`; on failure run `compensate`, then return the
    /// original error unchanged.
    ///
    /// `compensate` is never invoked when `forward` succeeds.
    pub async fn execute_with_rollback<T, F, FFut, C, CFut>(
        &self,
        operation: &str,
        forward: F,
        compensate: C,
    ) -> Result<T>
    where
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T>>,
        C: FnOnce() -> CFut,
        CFut: Future<Output = Result<()>>,
    {
        let err = match forward().await {
            Ok(value) => {
                self.committed.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
            Err(err) => err,
        };

        self.sink.warning(
            "Forward action failed, compensating",
            LOG_CONTEXT,
            Some(&json!({
                "operation": operation,
                "kind": err.kind(),
                "retryable": err.is_retryable(),
                "error": err.to_string(),
            })),
        );

        if let Err(compensation_err) = compensate().await {
            self.compensation_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "compensation for '{}' failed: original_error='{}'; compensation_error='{}'",
                operation, err, compensation_err
            );
            self.sink.error(
                "Compensating action failed",
                LOG_CONTEXT,
                Some(&json!({
                    "operation": operation,
                    "original_error": err.to_string(),
                    "compensation_error": compensation_err.to_string(),
                })),
            );
        }

        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        Err(err)
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            compensation_failures: self.compensation_failures.load(Ordering::Relaxed),
        }
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn rolled_back(&self) -> u64 {
        self.rolled_back.load(Ordering::Relaxed)
    }

    pub fn compensation_failures(&self) -> u64 {
        self.compensation_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PriorisError;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_success_skips_compensation() {
        let runner = CompensatingTransactionRunner::default();
        let counter = AtomicUsize::new(0);
        let compensations = &counter;

        let value = runner
            .execute_with_rollback(
                "ok",
                || async { Ok(42) },
                || async move {
                    compensations.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(compensations.load(Ordering::SeqCst), 0);
        assert_eq!(runner.stats().committed, 1);
    }

    #[tokio::test]
    async fn test_failure_runs_compensation_and_keeps_error() {
        let runner = CompensatingTransactionRunner::default();
        let counter = AtomicUsize::new(0);
        let compensations = &counter;

        let result: Result<()> = runner
            .execute_with_rollback(
                "verify",
                || async { Err(PriorisError::verification_failed("create_list", "L1")) },
                || async move {
                    compensations.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(PriorisError::VerificationFailed { ref entity_id, .. }) if entity_id == "L1"
        ));
        assert_eq!(compensations.load(Ordering::SeqCst), 1);
        assert_eq!(runner.stats().rolled_back, 1);
    }

    #[tokio::test]
    async fn test_compensation_failure_does_not_mask_original() {
        let runner = CompensatingTransactionRunner::default();

        let result: Result<()> = runner
            .execute_with_rollback(
                "save",
                || async { Err(PriorisError::persistence("save_list", "disk full")) },
                || async { Err(PriorisError::persistence("delete_list", "still full")) },
            )
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(runner.compensation_failures(), 1);
    }

    #[derive(Default)]
    struct CapturingSink {
        warnings: std::sync::Mutex<Vec<serde_json::Value>>,
    }

    impl LoggingSink for CapturingSink {
        fn log(
            &self,
            level: crate::observability::LogLevel,
            _message: &str,
            _context: &str,
            data: Option<&serde_json::Value>,
        ) {
            if level == crate::observability::LogLevel::Warning {
                if let Some(data) = data {
                    self.warnings.lock().unwrap().push(data.clone());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failure_log_flags_retryable_errors() {
        let sink = Arc::new(CapturingSink::default());
        let runner = CompensatingTransactionRunner::new(sink.clone());

        let _: Result<()> = runner
            .execute_with_rollback(
                "save",
                || async { Err(PriorisError::persistence("save_list", "disk full")) },
                || async { Ok(()) },
            )
            .await;
        let _: Result<()> = runner
            .execute_with_rollback(
                "lookup",
                || async { Err(PriorisError::not_found("list", "L9")) },
                || async { Ok(()) },
            )
            .await;

        let warnings = sink.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0]["retryable"], true);
        assert_eq!(warnings[1]["retryable"], false);
        assert_eq!(warnings[1]["kind"], "not_found");
    }
}
