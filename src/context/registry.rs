use crate::config::PriorisConfig;
use crate::core::{PriorisError, Result};
use crate::persistence::{InMemoryGateway, JsonFileGateway, PersistenceGateway};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a gateway from the configuration
pub type GatewayFactory =
    Box<dyn Fn(&PriorisConfig) -> BoxFuture<'static, Result<Arc<dyn PersistenceGateway>>> + Send + Sync>;

/// Backend key to gateway factory. Only consulted while wiring an
/// `AppContext`.
pub struct GatewayRegistry {
    factories: HashMap<String, GatewayFactory>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the `memory` and `file` backends
    pub fn with_default_backends() -> Self {
        let mut registry = Self::new();

        registry.register("memory", |_| {
            Box::pin(async {
                let gateway: Arc<dyn PersistenceGateway> = Arc::new(InMemoryGateway::new());
                Ok(gateway)
            })
        });

        registry.register("file", |config| {
            let path = config.data_path.clone();
            Box::pin(async move {
                let path = path.ok_or_else(|| {
                    PriorisError::InvalidConfig("the file backend requires data_path".into())
                })?;
                let gateway: Arc<dyn PersistenceGateway> = Arc::new(JsonFileGateway::open(path).await?);
                Ok(gateway)
            })
        });

        registry
    }

    /// Register `factory` under `key`, replacing any previous one.
    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn(&PriorisConfig) -> BoxFuture<'static, Result<Arc<dyn PersistenceGateway>>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(key.to_string(), Box::new(factory));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Build the gateway selected by `config.backend`.
    pub async fn build(&self, config: &PriorisConfig) -> Result<Arc<dyn PersistenceGateway>> {
        let factory = self.factories.get(&config.backend).ok_or_else(|| {
            PriorisError::InvalidConfig(format!(
                "unknown backend '{}' (registered: {})",
                config.backend,
                self.keys().join(", ")
            ))
        })?;
        factory(config).await
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::with_default_backends()
    }
}
