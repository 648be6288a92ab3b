// ============================================================================
// Prioris Core Library
// ============================================================================
//
// In-process transactional orchestrator for lists and list items:
//
// - `queue`: priority-ordered background work with retries
// - `transaction`: forward/compensate pairs around persistence calls
// - `state`: copy-on-write snapshot with a derived filtered view
// - `orchestrator`: the CRUD surface tying the three together
//
// ============================================================================

pub mod config;
pub mod context;
pub mod core;
pub mod filter;
pub mod model;
pub mod observability;
pub mod orchestrator;
pub mod persistence;
pub mod queue;
pub mod state;
pub mod transaction;

pub use config::{OrchestratorConfig, PriorisConfig, QueueConfig};
pub use context::{AppContext, AppContextBuilder, GatewayRegistry};
pub use core::{BoxError, PriorisError, Result};
pub use filter::{DateFilter, DefaultFilterProjection, FilterCriteria, FilterProjection, SortOption};
pub use model::{CustomList, ListItem, ListType, new_entity_id};
pub use observability::{ErrorHandler, LogLevel, LoggingErrorHandler, LoggingSink, TracingSink};
pub use orchestrator::ListsOrchestrator;
pub use persistence::{InMemoryGateway, JsonFileGateway, PersistOperation, PersistenceGateway};
pub use queue::{
    CleanupOptions, CleanupReport, EnqueueOptions, OperationPriority, OperationRecord,
    OperationStatus, PriorityRetryQueue, QueueStats, QueuedResult,
};
pub use state::{StateSnapshot, StateSubscription};
pub use transaction::{CompensatingTransactionRunner, TransactionStats};
