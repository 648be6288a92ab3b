use crate::core::PriorisError;
use tracing::{Level, event};

/// Receives every failure the orchestrator surfaces to callers.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: &PriorisError, context: &str);
}

/// Logs the failure with its user-facing message
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(&self, error: &PriorisError, context: &str) {
        event!(
            Level::ERROR,
            context,
            kind = error.kind(),
            retryable = error.is_retryable(),
            user_message = %error.user_message(),
            error = %error,
            "operation failed"
        );
    }
}
