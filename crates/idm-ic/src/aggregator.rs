//! Connector aggregator
//!
//! Registry of connector services keyed by framework. Populated once at
//! startup through `&mut self`, then shared as `Arc<ConnectorAggregator>`;
//! the read path takes no locks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{IcError, IcResult};
use crate::service::ConnectorService;

/// Registry of [`ConnectorService`] implementations.
#[derive(Default)]
pub struct ConnectorAggregator {
    services: HashMap<String, Arc<dyn ConnectorService>>,
}

impl ConnectorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit startup list; the first duplicate aborts.
    pub fn from_services<I>(services: I) -> IcResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn ConnectorService>>,
    {
        let mut aggregator = Self::new();
        for service in services {
            aggregator.register_service(service)?;
        }
        Ok(aggregator)
    }

    /// Register an implementation under `key`.
    ///
    /// A second registration for the same key fails and leaves the first one
    /// in place.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        implementation: Arc<dyn ConnectorService>,
    ) -> IcResult<()> {
        let key = key.into();
        if self.services.contains_key(&key) {
            return Err(IcError::DuplicateImplementation { framework: key });
        }
        info!(framework = %key, "Registered connector implementation");
        self.services.insert(key, implementation);
        Ok(())
    }

    /// Register an implementation under its own framework name.
    pub fn register_service(&mut self, implementation: Arc<dyn ConnectorService>) -> IcResult<()> {
        let key = implementation.framework().to_string();
        self.register(key, implementation)
    }

    /// Find the implementation for a framework.
    pub fn lookup(&self, framework: &str) -> IcResult<Arc<dyn ConnectorService>> {
        match self.services.get(framework) {
            Some(service) => Ok(Arc::clone(service)),
            None => {
                debug!(framework = %framework, "No connector implementation registered");
                Err(IcError::ImplementationNotFound {
                    framework: framework.to_string(),
                })
            }
        }
    }

    pub fn contains(&self, framework: &str) -> bool {
        self.services.contains_key(framework)
    }

    /// Registered framework names, sorted.
    pub fn frameworks(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.services.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ConnectorAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorAggregator")
            .field("frameworks", &self.frameworks())
            .finish()
    }
}
