//! Request file format.
//!
//! ```json
//! {
//!   "systems": [{ "name": "hr", "connector_key": { ... }, "configuration": [ ... ] }],
//!   "operations": [
//!     { "system": "hr", "operation_type": "create", "entity": { ... }, "mappings": [ ... ] },
//!     { "system": "hr", "operation_type": "delete", "uid": "jdoe" }
//!   ]
//! }
//! ```
//!
//! An operation either names its `uid` and `attributes` directly or carries an
//! `entity` plus `mappings` to evaluate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use idm_ic::object::{Attribute, ObjectClass};
use idm_provisioning::{
    AttributeMapping, MappingEngine, ProvisioningError, ProvisioningOperation,
    ProvisioningOperationType, SystemSnapshot,
};

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("cannot read request file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("system '{0}' is declared more than once")]
    DuplicateSystem(String),

    #[error("operation {index} references unknown system '{system}'")]
    UnknownSystem { index: usize, system: String },

    #[error("operation {index} has neither a uid nor an entity to map")]
    MissingUid { index: usize },

    #[error("operation {index}: {source}")]
    Mapping {
        index: usize,
        #[source]
        source: ProvisioningError,
    },
}

/// One requested change.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedOperation {
    /// Name of a system declared in the same request.
    pub system: String,
    pub operation_type: ProvisioningOperationType,
    #[serde(default = "ObjectClass::account")]
    pub object_class: ObjectClass,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub entity: Option<Value>,
    #[serde(default)]
    pub mappings: Vec<AttributeMapping>,
    #[serde(default)]
    pub entity_identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningRequest {
    pub systems: Vec<SystemSnapshot>,
    #[serde(default)]
    pub operations: Vec<RequestedOperation>,
}

impl ProvisioningRequest {
    pub fn load(path: &Path) -> Result<Self, RequestError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Build dispatchable operations, in request order.
    pub fn resolve(
        self,
        engine: &MappingEngine,
    ) -> Result<Vec<(ProvisioningOperation, Arc<SystemSnapshot>)>, RequestError> {
        let mut systems: HashMap<String, Arc<SystemSnapshot>> = HashMap::new();
        for system in self.systems {
            let name = system.name.clone();
            if systems.insert(name.clone(), Arc::new(system)).is_some() {
                return Err(RequestError::DuplicateSystem(name));
            }
        }

        self.operations
            .into_iter()
            .enumerate()
            .map(|(index, requested)| {
                let system = systems.get(&requested.system).cloned().ok_or_else(|| {
                    RequestError::UnknownSystem {
                        index,
                        system: requested.system.clone(),
                    }
                })?;
                let operation = build_operation(index, requested, &system, engine)?;
                Ok((operation, system))
            })
            .collect()
    }
}

fn build_operation(
    index: usize,
    requested: RequestedOperation,
    system: &SystemSnapshot,
    engine: &MappingEngine,
) -> Result<ProvisioningOperation, RequestError> {
    let operation = match (requested.entity, requested.uid) {
        (Some(entity), _) => {
            let mapped = engine
                .evaluate(&requested.mappings, &entity, requested.operation_type)
                .map_err(|source| RequestError::Mapping { index, source })?;
            ProvisioningOperation::from_mapping(
                requested.operation_type,
                system.id,
                requested.object_class,
                mapped,
            )
        }
        (None, Some(uid)) => {
            let attributes = match requested.operation_type {
                ProvisioningOperationType::Delete => Vec::new(),
                _ => requested.attributes,
            };
            ProvisioningOperation::new(
                requested.operation_type,
                system.id,
                uid,
                requested.object_class,
                attributes,
            )
        }
        (None, None) => return Err(RequestError::MissingUid { index }),
    };

    Ok(match requested.entity_identifier {
        Some(identifier) => operation.with_entity_identifier(identifier),
        None => operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"{
        "systems": [{
            "name": "hr",
            "connector_key": {
                "framework": "local",
                "bundle_name": "memory",
                "bundle_version": "1.0",
                "connector_name": "MemoryConnector"
            },
            "configuration": [{ "name": "namespace", "value": "hr", "required": true }]
        }],
        "operations": [
            {
                "system": "hr",
                "operation_type": "create",
                "entity": { "username": "jdoe", "email": "jdoe@example.com" },
                "mappings": [
                    { "schema_attribute": "__UID__", "idm_property": "username", "uid": true },
                    { "schema_attribute": "__NAME__", "idm_property": "username" },
                    { "schema_attribute": "mail", "idm_property": "email" }
                ]
            },
            { "system": "hr", "operation_type": "delete", "uid": "jdoe",
              "attributes": [{ "name": "mail", "values": ["x"] }] }
        ]
    }"#;

    #[test]
    fn test_resolve_request() {
        crate::logging::init_test_logging();
        let request = ProvisioningRequest::parse(REQUEST).unwrap();
        let resolved = request.resolve(&MappingEngine::new()).unwrap();
        assert_eq!(resolved.len(), 2);

        let (create, system) = &resolved[0];
        assert_eq!(create.operation_type, ProvisioningOperationType::Create);
        assert_eq!(create.system_id, system.id);
        assert_eq!(create.system_entity_uid, "jdoe");
        assert_eq!(create.attributes.len(), 2);

        let (delete, _) = &resolved[1];
        assert_eq!(delete.system_entity_uid, "jdoe");
        assert!(delete.attributes.is_empty());
        assert_eq!(delete.object_class, ObjectClass::account());
    }

    #[test]
    fn test_unknown_system() {
        let raw = r#"{ "systems": [], "operations": [
            { "system": "ad", "operation_type": "delete", "uid": "jdoe" }
        ] }"#;
        let err = ProvisioningRequest::parse(raw)
            .unwrap()
            .resolve(&MappingEngine::new())
            .unwrap_err();
        assert!(matches!(err, RequestError::UnknownSystem { index: 0, .. }));
    }

    #[test]
    fn test_operation_without_uid() {
        let raw = REQUEST.replace(r#""uid": "jdoe","#, "");
        let err = ProvisioningRequest::parse(&raw)
            .unwrap()
            .resolve(&MappingEngine::new())
            .unwrap_err();
        assert!(matches!(err, RequestError::MissingUid { index: 1 }));
    }
}
