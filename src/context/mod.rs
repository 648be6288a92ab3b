// ============================================================================
// Application Context
// ============================================================================
//
// The single per-process handle. `AppContextBuilder::build` resolves the
// persistence backend through the `GatewayRegistry`, validates the
// configuration and wires the queue and orchestrator with the same sink.
// Nothing here is global; callers pass the context (or clones of its parts)
// explicitly.
//
// ============================================================================

pub mod registry;

pub use registry::{GatewayFactory, GatewayRegistry};

use crate::config::PriorisConfig;
use crate::core::Result;
use crate::filter::{DefaultFilterProjection, FilterProjection};
use crate::observability::{ErrorHandler, LoggingErrorHandler, LoggingSink, TracingSink};
use crate::orchestrator::ListsOrchestrator;
use crate::persistence::PersistenceGateway;
use crate::queue::{EnqueueOptions, OperationPriority, PriorityRetryQueue, QueuedResult};
use serde_json::json;
use std::sync::Arc;

const LOG_CONTEXT: &str = "AppContext";

#[derive(Clone)]
pub struct AppContext {
    config: PriorisConfig,
    gateway: Arc<dyn PersistenceGateway>,
    sink: Arc<dyn LoggingSink>,
    error_handler: Arc<dyn ErrorHandler>,
    queue: PriorityRetryQueue,
    orchestrator: ListsOrchestrator,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn config(&self) -> &PriorisConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub fn sink(&self) -> &Arc<dyn LoggingSink> {
        &self.sink
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    pub fn queue(&self) -> &PriorityRetryQueue {
        &self.queue
    }

    pub fn orchestrator(&self) -> &ListsOrchestrator {
        &self.orchestrator
    }

    /// Reload every list from the gateway in the background, through the
    /// queue and its retry policy.
    pub fn schedule_sync(&self, priority: OperationPriority) -> QueuedResult<()> {
        let orchestrator = self.orchestrator.clone();
        self.sink.debug(
            "Background sync scheduled",
            LOG_CONTEXT,
            Some(&json!({ "priority": priority.to_string() })),
        );
        self.queue.enqueue(
            "sync_lists",
            move || {
                let orchestrator = orchestrator.clone();
                async move { orchestrator.load_all().await.map(|_| ()) }
            },
            EnqueueOptions::with_priority(priority),
        )
    }

    /// Cancel pending queue work and wait for in-flight work to finish.
    pub async fn shutdown(&self) {
        let cancelled = self.queue.cancel_all();
        self.queue.wait_idle().await;
        self.sink.info(
            "Context shut down",
            LOG_CONTEXT,
            Some(&json!({ "cancelled": cancelled })),
        );
    }
}

/// Collects the collaborators of an `AppContext`. Anything left unset
/// falls back to the defaults: the registry-built gateway, `TracingSink`,
/// `LoggingErrorHandler` and `DefaultFilterProjection`.
pub struct AppContextBuilder {
    config: PriorisConfig,
    registry: GatewayRegistry,
    gateway: Option<Arc<dyn PersistenceGateway>>,
    sink: Option<Arc<dyn LoggingSink>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    projection: Option<Arc<dyn FilterProjection>>,
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            config: PriorisConfig::default(),
            registry: GatewayRegistry::with_default_backends(),
            gateway: None,
            sink: None,
            error_handler: None,
            projection: None,
        }
    }

    pub fn config(mut self, config: PriorisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: GatewayRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use `gateway` directly instead of asking the registry.
    pub fn gateway(mut self, gateway: Arc<dyn PersistenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn projection(mut self, projection: Arc<dyn FilterProjection>) -> Self {
        self.projection = Some(projection);
        self
    }

    pub async fn build(self) -> Result<AppContext> {
        self.config.validate()?;

        let gateway = match self.gateway {
            Some(gateway) => gateway,
            None => self.registry.build(&self.config).await?,
        };
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let error_handler = self
            .error_handler
            .unwrap_or_else(|| Arc::new(LoggingErrorHandler));
        let projection = self
            .projection
            .unwrap_or_else(|| Arc::new(DefaultFilterProjection::new()));

        let queue = PriorityRetryQueue::with_sink(self.config.queue.clone(), sink.clone())?;
        let orchestrator = ListsOrchestrator::with_parts(
            gateway.clone(),
            projection,
            sink.clone(),
            error_handler.clone(),
            self.config.orchestrator.clone(),
        );

        sink.info(
            "Context ready",
            LOG_CONTEXT,
            Some(&json!({
                "backend": self.config.backend,
                "max_concurrent_operations": self.config.queue.max_concurrent_operations,
            })),
        );

        Ok(AppContext {
            config: self.config,
            gateway,
            sink,
            error_handler,
            queue,
            orchestrator,
        })
    }
}
