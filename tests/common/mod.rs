#![allow(dead_code)]

use async_trait::async_trait;
use prioris::{
    CustomList, ErrorHandler, InMemoryGateway, ListItem, ListsOrchestrator, LogLevel, LoggingSink,
    OrchestratorConfig, PersistOperation, PersistenceGateway, PriorisError, Result,
};
use prioris::filter::DefaultFilterProjection;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Gateway method a `FlakyGateway` can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    GetAllLists,
    SaveList,
    DeleteList,
    SaveItem,
    DeleteItem,
    ClearAll,
}

/// In-memory gateway with switchable failures and call counters.
#[derive(Default)]
pub struct FlakyGateway {
    pub inner: InMemoryGateway,
    faults: Mutex<Vec<Fault>>,
    /// Fail the n-th `save_item` call (1-based) once, when set
    fail_item_save_at: AtomicUsize,
    verify_false: AtomicBool,
    pub save_item_calls: AtomicUsize,
    pub delete_list_calls: AtomicUsize,
    pub delete_item_calls: AtomicUsize,
}

impl FlakyGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }

    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
        self.fail_item_save_at.store(0, Ordering::SeqCst);
        self.verify_false.store(false, Ordering::SeqCst);
    }

    pub fn fail_item_save_at(&self, call: usize) {
        self.fail_item_save_at.store(call, Ordering::SeqCst);
    }

    pub fn report_unverified(&self) {
        self.verify_false.store(true, Ordering::SeqCst);
    }

    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults.lock().unwrap().contains(&fault) {
            return Err(PriorisError::persistence(
                format!("{:?}", fault),
                "injected failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn get_all_lists(&self) -> Result<Vec<CustomList>> {
        self.check(Fault::GetAllLists)?;
        self.inner.get_all_lists().await
    }

    async fn get_list(&self, id: &str) -> Result<Option<CustomList>> {
        self.inner.get_list(id).await
    }

    async fn save_list(&self, list: &CustomList) -> Result<()> {
        self.check(Fault::SaveList)?;
        self.inner.save_list(list).await
    }

    async fn delete_list(&self, id: &str) -> Result<()> {
        self.delete_list_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Fault::DeleteList)?;
        self.inner.delete_list(id).await
    }

    async fn get_items_by_list(&self, list_id: &str) -> Result<Vec<ListItem>> {
        self.inner.get_items_by_list(list_id).await
    }

    async fn get_item(&self, id: &str) -> Result<Option<ListItem>> {
        self.inner.get_item(id).await
    }

    async fn save_item(&self, item: &ListItem) -> Result<()> {
        let call = self.save_item_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_item_save_at.load(Ordering::SeqCst) == call {
            return Err(PriorisError::persistence("save_item", "injected failure"));
        }
        self.check(Fault::SaveItem)?;
        self.inner.save_item(item).await
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.delete_item_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Fault::DeleteItem)?;
        self.inner.delete_item(id).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.check(Fault::ClearAll)?;
        self.inner.clear_all().await
    }

    async fn verify(&self, operation: PersistOperation, entity_id: &str) -> Result<bool> {
        if self.verify_false.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.verify(operation, entity_id).await
    }
}

/// Sink that keeps every entry for assertions
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl LoggingSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str, _context: &str, _data: Option<&Value>) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

/// Error handler that keeps `(kind, context)` of every report
#[derive(Default)]
pub struct RecordingErrorHandler {
    reports: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingErrorHandler {
    pub fn reports(&self) -> Vec<(&'static str, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorHandler for RecordingErrorHandler {
    fn handle_error(&self, error: &PriorisError, context: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((error.kind(), context.to_string()));
    }
}

pub struct Harness {
    pub gateway: Arc<FlakyGateway>,
    pub sink: Arc<RecordingSink>,
    pub errors: Arc<RecordingErrorHandler>,
    pub orchestrator: ListsOrchestrator,
}

pub fn harness() -> Harness {
    harness_with(OrchestratorConfig::default())
}

pub fn harness_with(config: OrchestratorConfig) -> Harness {
    let gateway = FlakyGateway::new();
    let sink = Arc::new(RecordingSink::default());
    let errors = Arc::new(RecordingErrorHandler::default());
    let orchestrator = ListsOrchestrator::with_parts(
        gateway.clone(),
        Arc::new(DefaultFilterProjection::new()),
        sink.clone(),
        errors.clone(),
        config,
    );
    Harness {
        gateway,
        sink,
        errors,
        orchestrator,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
