//! Connector service contract
//!
//! One [`ConnectorService`] exists per connector framework. The
//! [`ConnectorAggregator`](crate::aggregator::ConnectorAggregator) routes each
//! call to the service registered for `key.framework()`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::configuration::ConnectorConfiguration;
use crate::error::IcResult;
use crate::key::ConnectorKey;
use crate::object::{Attribute, ConnectorObject, Filter, ObjectClass, UidAttribute};

/// A connector available through a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub key: ConnectorKey,
    pub display_name: String,
}

/// Connector operations for one framework.
///
/// Implementations receive a configuration the facade has already checked for
/// presence; they own everything past that point, including conversion to
/// whatever their native layer speaks.
#[async_trait]
pub trait ConnectorService: Send + Sync {
    /// Framework discriminator this service answers for.
    fn framework(&self) -> &str;

    /// Create an object and return its UID.
    async fn create_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute>;

    /// Replace the given attributes on an existing object.
    ///
    /// Returns the UID after the update, which may differ from `uid`.
    async fn update_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute>;

    async fn delete_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<()>;

    /// Read one object; `None` when the target has no such object.
    async fn read_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<Option<ConnectorObject>>;

    async fn search_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
    ) -> IcResult<Vec<ConnectorObject>>;

    /// Test connectivity with the given configuration.
    async fn test(&self, key: &ConnectorKey, configuration: &ConnectorConfiguration)
        -> IcResult<()>;

    /// Object classes supported by the target.
    async fn schema(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
    ) -> IcResult<Vec<ObjectClass>>;

    /// Configuration template of a connector, with default values.
    async fn default_configuration(&self, key: &ConnectorKey) -> IcResult<ConnectorConfiguration>;

    /// Connectors this service can reach.
    async fn available_connectors(&self) -> Vec<ConnectorInfo>;
}
