// ============================================================================
// Observability Seams
// ============================================================================
//
// `LoggingSink` and `ErrorHandler` are fire-and-forget collaborators: they
// never fail and never change control flow. The defaults forward everything
// to `tracing`; applications can inject their own implementations.
//
// ============================================================================

pub mod error_handler;
pub mod sink;

pub use error_handler::{ErrorHandler, LoggingErrorHandler};
pub use sink::{LogLevel, LoggingSink, TracingSink};
