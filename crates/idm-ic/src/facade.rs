//! Connector facade
//!
//! Entry point used by the provisioning core. Every call checks that a
//! configuration is present, resolves the service for `key.framework()` and
//! delegates. The facade never retries.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::aggregator::ConnectorAggregator;
use crate::configuration::ConnectorConfiguration;
use crate::error::{IcError, IcResult};
use crate::key::ConnectorKey;
use crate::object::{Attribute, ConnectorObject, Filter, ObjectClass, UidAttribute};
use crate::service::{ConnectorInfo, ConnectorService};

/// Routes connector calls to the registered framework service.
#[derive(Debug, Clone)]
pub struct ConnectorFacade {
    aggregator: Arc<ConnectorAggregator>,
}

impl ConnectorFacade {
    pub fn new(aggregator: Arc<ConnectorAggregator>) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Arc<ConnectorAggregator> {
        &self.aggregator
    }

    /// Configuration check followed by service lookup.
    ///
    /// Runs before anything reaches a connector.
    fn resolve<'a>(
        &self,
        key: &ConnectorKey,
        configuration: Option<&'a ConnectorConfiguration>,
    ) -> IcResult<(Arc<dyn ConnectorService>, &'a ConnectorConfiguration)> {
        let configuration = match configuration {
            Some(c) if !c.is_empty() => c,
            Some(_) => {
                return Err(IcError::invalid_configuration(format!(
                    "configuration for connector {key} is empty"
                )))
            }
            None => {
                return Err(IcError::invalid_configuration(format!(
                    "configuration for connector {key} is required"
                )))
            }
        };
        configuration.validate()?;
        let service = self.aggregator.lookup(key.framework())?;
        Ok((service, configuration))
    }

    #[instrument(skip_all, fields(connector_key = %key, object_class = %object_class))]
    pub async fn create_object(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
        object_class: &ObjectClass,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute> {
        let (service, configuration) = self.resolve(key, configuration)?;
        let uid = service
            .create_object(key, configuration, object_class, attributes)
            .await?;
        debug!(uid = %uid, "Object created");
        Ok(uid)
    }

    #[instrument(skip_all, fields(connector_key = %key, object_class = %object_class, uid = %uid))]
    pub async fn update_object(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
        object_class: &ObjectClass,
        uid: &UidAttribute,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service
            .update_object(key, configuration, object_class, uid, attributes)
            .await
    }

    #[instrument(skip_all, fields(connector_key = %key, object_class = %object_class, uid = %uid))]
    pub async fn delete_object(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<()> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service
            .delete_object(key, configuration, object_class, uid)
            .await
    }

    pub async fn read_object(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<Option<ConnectorObject>> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service
            .read_object(key, configuration, object_class, uid)
            .await
    }

    pub async fn search_object(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
    ) -> IcResult<Vec<ConnectorObject>> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service
            .search_object(key, configuration, object_class, filter)
            .await
    }

    #[instrument(skip_all, fields(connector_key = %key))]
    pub async fn test(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
    ) -> IcResult<()> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service.test(key, configuration).await
    }

    pub async fn schema(
        &self,
        key: &ConnectorKey,
        configuration: Option<&ConnectorConfiguration>,
    ) -> IcResult<Vec<ObjectClass>> {
        let (service, configuration) = self.resolve(key, configuration)?;
        service.schema(key, configuration).await
    }

    /// Configuration template of a connector. Needs no configuration.
    pub async fn default_configuration(&self, key: &ConnectorKey) -> IcResult<ConnectorConfiguration> {
        self.aggregator
            .lookup(key.framework())?
            .default_configuration(key)
            .await
    }

    /// Connectors reachable through every registered framework.
    pub async fn available_connectors(&self) -> Vec<ConnectorInfo> {
        let mut connectors = Vec::new();
        for framework in self.aggregator.frameworks() {
            if let Ok(service) = self.aggregator.lookup(&framework) {
                connectors.extend(service.available_connectors().await);
            }
        }
        connectors
    }
}
