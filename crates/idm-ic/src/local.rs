//! Local connector framework
//!
//! Hosts native connector bundles installed in-process. Each call resolves the
//! bundle by key, builds a connector instance from the converted
//! configuration and translates the request and result between the neutral
//! and native models.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::configuration::ConnectorConfiguration;
use crate::convert;
use crate::error::{IcError, IcOperation, IcResult};
use crate::key::ConnectorKey;
use crate::native::{NativeConnector, NativeConnectorInfo, NativeError};
use crate::object::{Attribute, ConnectorObject, Filter, ObjectClass, UidAttribute};
use crate::service::{ConnectorInfo, ConnectorService};

/// Framework name of the in-process connector host.
pub const LOCAL_FRAMEWORK: &str = "local";

/// [`ConnectorService`] over installed native bundles.
#[derive(Debug, Default)]
pub struct LocalConnectorService {
    bundles: HashMap<String, NativeConnectorInfo>,
}

impl LocalConnectorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a bundle. A bundle with the same full name is rejected.
    pub fn install(&mut self, info: NativeConnectorInfo) -> IcResult<()> {
        let full_name = info.full_name();
        if self.bundles.contains_key(&full_name) {
            return Err(IcError::DuplicateConnector { full_name });
        }
        info!(connector = %full_name, "Installed connector bundle");
        self.bundles.insert(full_name, info);
        Ok(())
    }

    /// Builder form of [`install`](Self::install).
    pub fn with_bundle(mut self, info: NativeConnectorInfo) -> IcResult<Self> {
        self.install(info)?;
        Ok(self)
    }

    fn bundle(&self, key: &ConnectorKey) -> IcResult<&NativeConnectorInfo> {
        self.bundles
            .get(&key.full_name())
            .ok_or_else(|| IcError::ConnectorNotFound { key: key.clone() })
    }

    /// Resolve the bundle and build a connector for this configuration.
    fn connect(
        &self,
        operation: IcOperation,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: Option<&ObjectClass>,
    ) -> IcResult<Arc<dyn NativeConnector>> {
        let bundle = self.bundle(key)?;
        let properties = convert::configuration_to_native(configuration);
        debug!(connector_key = %key, operation = %operation, "Creating native connector");
        bundle
            .factory
            .create(&properties)
            .map_err(|e| IcError::connector(operation, key, object_class, e))
    }
}

fn wrap<'a>(
    operation: IcOperation,
    key: &'a ConnectorKey,
    object_class: Option<&'a ObjectClass>,
) -> impl FnOnce(NativeError) -> IcError + 'a {
    move |e| IcError::connector(operation, key, object_class, e)
}

#[async_trait]
impl ConnectorService for LocalConnectorService {
    fn framework(&self) -> &str {
        LOCAL_FRAMEWORK
    }

    async fn create_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute> {
        let op = IcOperation::Create;
        let connector = self.connect(op, key, configuration, Some(object_class))?;
        let uid = connector
            .create(object_class.name(), convert::attributes_to_native(attributes))
            .await
            .map_err(wrap(op, key, Some(object_class)))?;
        Ok(convert::uid_from_native(&uid))
    }

    async fn update_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
        attributes: &[Attribute],
    ) -> IcResult<UidAttribute> {
        let op = IcOperation::Update;
        let connector = self.connect(op, key, configuration, Some(object_class))?;
        let updated = connector
            .update(
                object_class.name(),
                &convert::uid_to_native(uid),
                convert::attributes_to_native(attributes),
            )
            .await
            .map_err(wrap(op, key, Some(object_class)))?;
        Ok(convert::uid_from_native(&updated))
    }

    async fn delete_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<()> {
        let op = IcOperation::Delete;
        let connector = self.connect(op, key, configuration, Some(object_class))?;
        connector
            .delete(object_class.name(), &convert::uid_to_native(uid))
            .await
            .map_err(wrap(op, key, Some(object_class)))
    }

    async fn read_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        uid: &UidAttribute,
    ) -> IcResult<Option<ConnectorObject>> {
        let op = IcOperation::Read;
        let connector = self.connect(op, key, configuration, Some(object_class))?;
        let object = connector
            .get(object_class.name(), &convert::uid_to_native(uid))
            .await
            .map_err(wrap(op, key, Some(object_class)))?;
        Ok(object.as_ref().map(convert::object_from_native))
    }

    async fn search_object(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
    ) -> IcResult<Vec<ConnectorObject>> {
        let op = IcOperation::Search;
        let connector = self.connect(op, key, configuration, Some(object_class))?;
        let objects = connector
            .search(object_class.name(), filter)
            .await
            .map_err(wrap(op, key, Some(object_class)))?;
        Ok(objects.iter().map(convert::object_from_native).collect())
    }

    async fn test(&self, key: &ConnectorKey, configuration: &ConnectorConfiguration) -> IcResult<()> {
        let op = IcOperation::Test;
        let connector = self.connect(op, key, configuration, None)?;
        connector.test().await.map_err(wrap(op, key, None))
    }

    async fn schema(
        &self,
        key: &ConnectorKey,
        configuration: &ConnectorConfiguration,
    ) -> IcResult<Vec<ObjectClass>> {
        let op = IcOperation::Schema;
        let connector = self.connect(op, key, configuration, None)?;
        let classes = connector.schema().await.map_err(wrap(op, key, None))?;
        Ok(classes.into_iter().map(ObjectClass::new).collect())
    }

    async fn default_configuration(&self, key: &ConnectorKey) -> IcResult<ConnectorConfiguration> {
        let bundle = self.bundle(key)?;
        Ok(convert::configuration_from_native(
            &bundle.factory.default_configuration(),
        ))
    }

    async fn available_connectors(&self) -> Vec<ConnectorInfo> {
        let mut connectors: Vec<ConnectorInfo> = self
            .bundles
            .values()
            .map(|b| ConnectorInfo {
                key: ConnectorKey::new(
                    LOCAL_FRAMEWORK,
                    b.bundle_name.clone(),
                    b.bundle_version.clone(),
                    b.connector_name.clone(),
                ),
                display_name: b.display_name.clone(),
            })
            .collect();
        connectors.sort_by_key(|c| c.key.to_string());
        connectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigurationProperty;
    use crate::memory::{MemoryConnectorFactory, MemoryStore};
    use crate::object::NAME_NAME;

    fn memory_key() -> ConnectorKey {
        ConnectorKey::new(LOCAL_FRAMEWORK, "memory", "1.0", "MemoryConnector")
    }

    fn service() -> LocalConnectorService {
        let factory = Arc::new(MemoryConnectorFactory::new(MemoryStore::new()));
        LocalConnectorService::new()
            .with_bundle(NativeConnectorInfo::new("memory", "1.0", "MemoryConnector", factory))
            .unwrap()
    }

    fn configuration() -> ConnectorConfiguration {
        ConnectorConfiguration::default()
            .with_property(ConfigurationProperty::new("namespace", "test").required())
    }

    #[test]
    fn test_install_rejects_duplicate_bundle() {
        let mut service = service();
        let factory = Arc::new(MemoryConnectorFactory::new(MemoryStore::new()));
        let err = service
            .install(NativeConnectorInfo::new("memory", "1.0", "MemoryConnector", factory))
            .unwrap_err();
        assert!(matches!(err, IcError::DuplicateConnector { .. }));
    }

    #[tokio::test]
    async fn test_unknown_bundle() {
        let key = ConnectorKey::new(LOCAL_FRAMEWORK, "ldap", "2.0", "LdapConnector");
        let err = service()
            .test(&key, &configuration())
            .await
            .unwrap_err();
        assert!(matches!(err, IcError::ConnectorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_read_delete() {
        let service = service();
        let key = memory_key();
        let config = configuration();
        let account = ObjectClass::account();

        let uid = service
            .create_object(
                &key,
                &config,
                &account,
                &[
                    Attribute::single(NAME_NAME, "jdoe"),
                    Attribute::single("mail", "jdoe@example.com"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(uid.value, "jdoe");
        assert_eq!(uid.name.as_deref(), Some("__UID__"));

        let object = service
            .read_object(&key, &config, &account, &uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object.uid().as_deref(), Some("jdoe"));

        service
            .delete_object(&key, &config, &account, &uid)
            .await
            .unwrap();
        assert!(service
            .read_object(&key, &config, &account, &uid)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_native_error_is_wrapped() {
        let service = service();
        let err = service
            .update_object(
                &memory_key(),
                &configuration(),
                &ObjectClass::account(),
                &UidAttribute::from_value("missing"),
                &[Attribute::single("mail", "x@example.com")],
            )
            .await
            .unwrap_err();

        match err {
            IcError::Connector {
                operation,
                key,
                object_class,
                source,
            } => {
                assert_eq!(operation, IcOperation::Update);
                assert_eq!(key, memory_key());
                assert_eq!(object_class, Some(ObjectClass::account()));
                assert_eq!(source, NativeError::UnknownUid("missing".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_default_configuration_and_listing() {
        let service = service();
        let config = service.default_configuration(&memory_key()).await.unwrap();
        let namespace = config.property("Namespace").unwrap();
        assert!(namespace.required);

        let connectors = service.available_connectors().await;
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].key, memory_key());
    }
}
