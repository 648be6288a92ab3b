use crate::core::{PriorisError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Priority retry queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of operations executing at the same time
    pub max_concurrent_operations: usize,

    /// Retries granted to an operation that does not set its own
    pub default_max_retries: u32,

    /// Fixed delay between attempts for operations that do not set their own
    #[serde(with = "duration_ms", rename = "default_retry_delay_ms")]
    pub default_retry_delay: Duration,

    /// Number of terminal operation records retained for statistics
    pub max_history: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 3,
            default_max_retries: 3,
            default_retry_delay: Duration::from_secs(1),
            max_history: 1000,
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency cap
    pub fn max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    /// Set the default retry budget
    pub fn default_max_retries(mut self, retries: u32) -> Self {
        self.default_max_retries = retries;
        self
    }

    /// Set the default delay between attempts
    pub fn default_retry_delay(mut self, delay: Duration) -> Self {
        self.default_retry_delay = delay;
        self
    }

    /// Set how many finished operations are remembered
    pub fn max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_operations == 0 {
            return Err(PriorisError::InvalidConfig(
                "max_concurrent_operations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Orchestrator behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Confirm inserts with `PersistenceGateway::verify` before touching state
    pub verify_writes: bool,

    /// Reload from the gateway after a failed `clear_all` was compensated
    pub reload_after_clear_rollback: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            verify_writes: true,
            reload_after_clear_rollback: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify_writes(mut self, enabled: bool) -> Self {
        self.verify_writes = enabled;
        self
    }

    pub fn reload_after_clear_rollback(mut self, enabled: bool) -> Self {
        self.reload_after_clear_rollback = enabled;
        self
    }

    /// Every combination of the switches is accepted.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Top-level configuration consumed by `AppContextBuilder`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorisConfig {
    pub queue: QueueConfig,
    pub orchestrator: OrchestratorConfig,

    /// Key of the persistence backend in the gateway registry
    pub backend: String,

    /// Data file for the `file` backend
    pub data_path: Option<PathBuf>,
}

impl Default for PriorisConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            backend: "memory".to_string(),
            data_path: None,
        }
    }
}

impl PriorisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn backend(mut self, backend: &str) -> Self {
        self.backend = backend.to_string();
        self
    }

    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    ///
    /// ```
    /// # use prioris::PriorisConfig;
    /// let config = PriorisConfig::from_json_str(
    ///     r#"{ "queue": { "max_concurrent_operations": 5, "default_retry_delay_ms": 250 } }"#
    /// ).unwrap();
    /// assert_eq!(config.queue.max_concurrent_operations, 5);
    /// assert_eq!(config.backend, "memory");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| PriorisError::InvalidConfig(format!("Invalid JSON config: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `PRIORIS_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("PRIORIS_MAX_CONCURRENT_OPERATIONS") {
            config.queue.max_concurrent_operations = parse_var("PRIORIS_MAX_CONCURRENT_OPERATIONS", &value)?;
        }
        if let Some(value) = lookup("PRIORIS_MAX_RETRIES") {
            config.queue.default_max_retries = parse_var("PRIORIS_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("PRIORIS_RETRY_DELAY_MS") {
            let millis: u64 = parse_var("PRIORIS_RETRY_DELAY_MS", &value)?;
            config.queue.default_retry_delay = Duration::from_millis(millis);
        }
        if let Some(value) = lookup("PRIORIS_VERIFY_WRITES") {
            config.orchestrator.verify_writes = parse_var("PRIORIS_VERIFY_WRITES", &value)?;
        }
        if let Some(value) = lookup("PRIORIS_BACKEND") {
            config.backend = value;
        }
        if let Some(value) = lookup("PRIORIS_DATA_PATH") {
            config.data_path = Some(PathBuf::from(value));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.queue.validate()?;
        self.orchestrator.validate()?;
        if self.backend.trim().is_empty() {
            return Err(PriorisError::InvalidConfig("backend must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PriorisError::InvalidConfig(format!("{} has invalid value '{}'", key, value)))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
