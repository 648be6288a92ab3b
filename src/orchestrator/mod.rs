// ============================================================================
// Lists Orchestrator
// ============================================================================
//
// Coordinates the persistence gateway with the published snapshot.
//
// Every mutating operation is a forward action (write through the gateway,
// then publish) paired with a compensating action (undo the write, restore
// the snapshot entry). The snapshot is only published once the gateway call
// and its verification have succeeded, so a failure leaves `lists` exactly
// as it was.
//
// Failures are reported to the `ErrorHandler`, their user message is written
// into `snapshot.error`, and the error is returned to the caller. The next
// successful mutation clears `snapshot.error`.
//
// ============================================================================

mod filters;
mod items;
mod lists;

use crate::config::OrchestratorConfig;
use crate::core::{PriorisError, Result};
use crate::filter::{DefaultFilterProjection, FilterProjection};
use crate::model::CustomList;
use crate::observability::{ErrorHandler, LoggingErrorHandler, LoggingSink, TracingSink};
use crate::persistence::PersistenceGateway;
use crate::state::{StateSnapshot, StateStore, StateSubscription};
use crate::transaction::{CompensatingTransactionRunner, TransactionStats};
use std::sync::Arc;

const LOG_CONTEXT: &str = "ListsOrchestrator";

/// Transactional CRUD over lists and items. Cheap to clone.
#[derive(Clone)]
pub struct ListsOrchestrator {
    store: Arc<StateStore>,
    gateway: Arc<dyn PersistenceGateway>,
    runner: Arc<CompensatingTransactionRunner>,
    error_handler: Arc<dyn ErrorHandler>,
    sink: Arc<dyn LoggingSink>,
    config: OrchestratorConfig,
}

impl ListsOrchestrator {
    /// Orchestrator over `gateway` with the default projection, tracing
    /// sink, logging error handler and configuration.
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_parts(
            gateway,
            Arc::new(DefaultFilterProjection::new()),
            Arc::new(TracingSink),
            Arc::new(LoggingErrorHandler),
            OrchestratorConfig::default(),
        )
    }

    pub fn with_parts(
        gateway: Arc<dyn PersistenceGateway>,
        projection: Arc<dyn FilterProjection>,
        sink: Arc<dyn LoggingSink>,
        error_handler: Arc<dyn ErrorHandler>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store: Arc::new(StateStore::new(projection)),
            gateway,
            runner: Arc::new(CompensatingTransactionRunner::new(sink.clone())),
            error_handler,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.store.current()
    }

    /// Read-only observer of future snapshots
    pub fn subscribe(&self) -> StateSubscription {
        self.store.subscribe()
    }

    pub fn find_list(&self, id: &str) -> Option<CustomList> {
        self.store.current().find_list(id).cloned()
    }

    /// Commit and rollback counters of the underlying runner
    pub fn transaction_stats(&self) -> TransactionStats {
        self.runner.stats()
    }

    /// Drop all in-memory lists and status flags. The gateway is untouched
    /// and the filter criteria are kept.
    pub fn reset(&self) -> Arc<StateSnapshot> {
        self.store.reset()
    }

    /// Report a failed operation and surface its user message.
    fn settle<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        result.map_err(|err| {
            self.report_failure(operation, &err, false);
            err
        })
    }

    fn report_failure(&self, operation: &str, err: &PriorisError, clear_loading: bool) {
        self.error_handler
            .handle_error(err, &format!("{}::{}", LOG_CONTEXT, operation));
        let message = err.user_message();
        self.store.publish(|draft| {
            draft.error = Some(message);
            if clear_loading {
                draft.is_loading = false;
            }
        });
    }
}
