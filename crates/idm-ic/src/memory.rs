//! In-memory connector bundle
//!
//! A [`NativeConnector`] keeping objects in a shared store, partitioned by the
//! required `namespace` configuration property. Serves as the reference
//! bundle for the local framework and as a target for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::convert;
use crate::native::{
    NativeAttribute, NativeConfigurationProperty, NativeConnector, NativeConnectorFactory,
    NativeConnectorObject, NativeError, NativeResult, NativeUid,
};
use crate::object::{Filter, NAME_NAME, UID_NAME};

/// Name of the property selecting the store partition.
pub const NAMESPACE_PROPERTY: &str = "namespace";

type ClassMap = HashMap<String, BTreeMap<String, Vec<NativeAttribute>>>;

/// Shared object store; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, ClassMap>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects of a class in a namespace.
    pub async fn count(&self, namespace: &str, object_class: &str) -> usize {
        let guard = self.inner.read().await;
        guard
            .get(namespace)
            .and_then(|classes| classes.get(object_class))
            .map_or(0, BTreeMap::len)
    }
}

/// Factory for [`MemoryConnector`] instances over one store.
#[derive(Debug, Clone)]
pub struct MemoryConnectorFactory {
    store: MemoryStore,
}

impl MemoryConnectorFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl NativeConnectorFactory for MemoryConnectorFactory {
    fn default_configuration(&self) -> Vec<NativeConfigurationProperty> {
        vec![NativeConfigurationProperty {
            name: NAMESPACE_PROPERTY.to_string(),
            display_name: "Namespace".to_string(),
            help_message: "Partition of the store this connector works in".to_string(),
            value: Value::Null,
            confidential: false,
            required: true,
            order: 1,
            value_type: "string".to_string(),
        }]
    }

    fn create(
        &self,
        properties: &[NativeConfigurationProperty],
    ) -> NativeResult<Arc<dyn NativeConnector>> {
        // Matched case-insensitively: a configuration obtained from the default
        // template carries the display name as its property name.
        let namespace = properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(NAMESPACE_PROPERTY))
            .and_then(|p| p.value.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                NativeError::InvalidConfiguration(format!(
                    "property '{NAMESPACE_PROPERTY}' is required"
                ))
            })?;

        Ok(Arc::new(MemoryConnector {
            namespace: namespace.to_string(),
            store: self.store.clone(),
        }))
    }
}

/// Connector instance bound to one namespace.
#[derive(Debug)]
pub struct MemoryConnector {
    namespace: String,
    store: MemoryStore,
}

impl MemoryConnector {
    fn to_object(object_class: &str, uid: &str, attributes: &[NativeAttribute]) -> NativeConnectorObject {
        NativeConnectorObject {
            object_class: object_class.to_string(),
            uid: NativeUid::new(uid),
            attributes: attributes.to_vec(),
        }
    }
}

fn naming_value(attributes: &[NativeAttribute]) -> Option<String> {
    attributes
        .iter()
        .find(|a| a.name == NAME_NAME || a.name == UID_NAME)
        .and_then(|a| a.values.first())
        .and_then(|v| v.to_plain_string())
}

#[async_trait]
impl NativeConnector for MemoryConnector {
    async fn create(
        &self,
        object_class: &str,
        attributes: Vec<NativeAttribute>,
    ) -> NativeResult<NativeUid> {
        let uid = naming_value(&attributes).unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut guard = self.store.inner.write().await;
        let objects = guard
            .entry(self.namespace.clone())
            .or_default()
            .entry(object_class.to_string())
            .or_default();

        if objects.contains_key(&uid) {
            return Err(NativeError::AlreadyExists(uid));
        }
        debug!(namespace = %self.namespace, object_class, uid = %uid, "Memory object created");
        objects.insert(uid.clone(), attributes);
        Ok(NativeUid::new(uid))
    }

    async fn update(
        &self,
        object_class: &str,
        uid: &NativeUid,
        attributes: Vec<NativeAttribute>,
    ) -> NativeResult<NativeUid> {
        let mut guard = self.store.inner.write().await;
        let stored = guard
            .get_mut(&self.namespace)
            .and_then(|classes| classes.get_mut(object_class))
            .and_then(|objects| objects.get_mut(&uid.value))
            .ok_or_else(|| NativeError::UnknownUid(uid.value.clone()))?;

        for attribute in attributes {
            match stored.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = attribute,
                None => stored.push(attribute),
            }
        }
        stored.retain(|a| !a.values.is_empty());
        Ok(NativeUid::new(uid.value.clone()))
    }

    async fn delete(&self, object_class: &str, uid: &NativeUid) -> NativeResult<()> {
        let mut guard = self.store.inner.write().await;
        let removed = guard
            .get_mut(&self.namespace)
            .and_then(|classes| classes.get_mut(object_class))
            .and_then(|objects| objects.remove(&uid.value));
        if removed.is_none() {
            debug!(namespace = %self.namespace, object_class, uid = %uid, "Delete of absent object");
        }
        Ok(())
    }

    async fn get(
        &self,
        object_class: &str,
        uid: &NativeUid,
    ) -> NativeResult<Option<NativeConnectorObject>> {
        let guard = self.store.inner.read().await;
        Ok(guard
            .get(&self.namespace)
            .and_then(|classes| classes.get(object_class))
            .and_then(|objects| objects.get(&uid.value))
            .map(|attributes| Self::to_object(object_class, &uid.value, attributes)))
    }

    async fn search(
        &self,
        object_class: &str,
        filter: Option<&Filter>,
    ) -> NativeResult<Vec<NativeConnectorObject>> {
        let guard = self.store.inner.read().await;
        let Some(objects) = guard
            .get(&self.namespace)
            .and_then(|classes| classes.get(object_class))
        else {
            return Ok(Vec::new());
        };

        Ok(objects
            .iter()
            .map(|(uid, attributes)| Self::to_object(object_class, uid, attributes))
            .filter(|object| {
                filter.map_or(true, |f| f.matches(&convert::object_from_native(object)))
            })
            .collect())
    }

    async fn test(&self) -> NativeResult<()> {
        Ok(())
    }

    async fn schema(&self) -> NativeResult<Vec<String>> {
        let guard = self.store.inner.read().await;
        let mut classes: Vec<String> = guard
            .get(&self.namespace)
            .map(|classes| classes.keys().cloned().collect())
            .unwrap_or_default();
        classes.sort();
        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connector(store: &MemoryStore, namespace: &str) -> Arc<dyn NativeConnector> {
        let mut properties = MemoryConnectorFactory::new(store.clone()).default_configuration();
        properties[0].value = json!(namespace);
        MemoryConnectorFactory::new(store.clone())
            .create(&properties)
            .unwrap()
    }

    fn attr(name: &str, value: &str) -> NativeAttribute {
        NativeAttribute::new(name, vec![value.into()])
    }

    #[test]
    fn test_namespace_required() {
        let factory = MemoryConnectorFactory::new(MemoryStore::new());
        let err = factory
            .create(&factory.default_configuration())
            .err()
            .unwrap();
        assert!(matches!(err, NativeError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_create_uses_name_or_generates() {
        let store = MemoryStore::new();
        let c = connector(&store, "a");

        let uid = c
            .create("__ACCOUNT__", vec![attr(NAME_NAME, "jdoe")])
            .await
            .unwrap();
        assert_eq!(uid.value, "jdoe");

        let generated = c
            .create("__ACCOUNT__", vec![attr("mail", "x@example.com")])
            .await
            .unwrap();
        assert!(Uuid::parse_str(&generated.value).is_ok());

        let dup = c
            .create("__ACCOUNT__", vec![attr(NAME_NAME, "jdoe")])
            .await
            .unwrap_err();
        assert_eq!(dup, NativeError::AlreadyExists("jdoe".into()));
        assert_eq!(store.count("a", "__ACCOUNT__").await, 2);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = MemoryStore::new();
        connector(&store, "a")
            .create("__ACCOUNT__", vec![attr(NAME_NAME, "jdoe")])
            .await
            .unwrap();

        let other = connector(&store, "b");
        assert!(other
            .get("__ACCOUNT__", &NativeUid::new("jdoe"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_and_clears() {
        let store = MemoryStore::new();
        let c = connector(&store, "a");
        let uid = c
            .create(
                "__ACCOUNT__",
                vec![attr(NAME_NAME, "jdoe"), attr("mail", "old@example.com"), attr("title", "x")],
            )
            .await
            .unwrap();

        c.update(
            "__ACCOUNT__",
            &uid,
            vec![attr("mail", "new@example.com"), NativeAttribute::new("title", vec![])],
        )
        .await
        .unwrap();

        let object = c.get("__ACCOUNT__", &uid).await.unwrap().unwrap();
        let mail = object.attributes.iter().find(|a| a.name == "mail").unwrap();
        assert_eq!(mail.values[0].as_string(), Some("new@example.com"));
        assert!(object.attributes.iter().all(|a| a.name != "title"));

        let err = c
            .update("__ACCOUNT__", &NativeUid::new("nobody"), vec![])
            .await
            .unwrap_err();
        assert_eq!(err, NativeError::UnknownUid("nobody".into()));
    }

    #[tokio::test]
    async fn test_multi_valued_flag_survives_read() {
        let store = MemoryStore::new();
        let c = connector(&store, "a");
        let groups = NativeAttribute::new("groups", vec!["admins".into()]).multi_valued(true);
        let uid = c
            .create("__ACCOUNT__", vec![attr(NAME_NAME, "jdoe"), groups.clone()])
            .await
            .unwrap();

        let object = c.get("__ACCOUNT__", &uid).await.unwrap().unwrap();
        let stored = object.attributes.iter().find(|a| a.name == "groups").unwrap();
        assert_eq!(stored, &groups);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let c = connector(&store, "a");
        let uid = c
            .create("__GROUP__", vec![attr(NAME_NAME, "admins")])
            .await
            .unwrap();

        c.delete("__GROUP__", &uid).await.unwrap();
        c.delete("__GROUP__", &uid).await.unwrap();
        assert_eq!(store.count("a", "__GROUP__").await, 0);
    }

    #[tokio::test]
    async fn test_search_with_filter_and_schema() {
        let store = MemoryStore::new();
        let c = connector(&store, "a");
        for (name, dept) in [("jdoe", "eng"), ("asmith", "ops"), ("bjones", "eng")] {
            c.create("__ACCOUNT__", vec![attr(NAME_NAME, name), attr("dept", dept)])
                .await
                .unwrap();
        }
        c.create("__GROUP__", vec![attr(NAME_NAME, "admins")])
            .await
            .unwrap();

        let all = c.search("__ACCOUNT__", None).await.unwrap();
        assert_eq!(all.len(), 3);

        let filter = Filter::eq("dept", "eng");
        let eng = c.search("__ACCOUNT__", Some(&filter)).await.unwrap();
        let uids: Vec<_> = eng.iter().map(|o| o.uid.value.as_str()).collect();
        assert_eq!(uids, vec!["bjones", "jdoe"]);

        assert!(c.search("role", None).await.unwrap().is_empty());
        assert_eq!(
            c.schema().await.unwrap(),
            vec!["__ACCOUNT__".to_string(), "__GROUP__".to_string()]
        );
    }
}
