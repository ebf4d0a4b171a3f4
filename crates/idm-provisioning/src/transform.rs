//! Attribute mapping
//!
//! Turns an identity-side entity (JSON) into the attribute set and uid of a
//! target object. Each [`AttributeMapping`] reads one entity property and may
//! run a Rhai transform script over it.
//!
//! Scripts run in a fresh, sandboxed engine per evaluation with two variables
//! in scope: `attributeValue` (the mapped property, `()` when absent) and
//! `entity` (the whole entity). The script's last expression is the value.

use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use idm_ic::object::{Attribute, AttributeValue};

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::types::ProvisioningOperationType;

/// Default maximum number of operations a script may run.
pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

const DEFAULT_MAX_CALL_STACK_DEPTH: usize = 64;
const DEFAULT_MAX_STRING_SIZE: usize = 65536;
const DEFAULT_MAX_ARRAY_SIZE: usize = 10_000;
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Sandbox limits for transform scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLimits {
    pub max_operations: u64,
    pub max_call_stack_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_stack_depth: DEFAULT_MAX_CALL_STACK_DEPTH,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Mapping of one entity property to one target attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    /// Attribute name on the target.
    pub schema_attribute: String,
    /// Entity property to read; dots descend into nested objects.
    #[serde(default)]
    pub idm_property: Option<String>,
    #[serde(default)]
    pub transform_script: Option<String>,
    /// This mapping yields the object's uid.
    #[serde(default)]
    pub uid: bool,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default = "default_true")]
    pub send_on_create: bool,
    #[serde(default = "default_true")]
    pub send_on_update: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl AttributeMapping {
    pub fn new(schema_attribute: impl Into<String>, idm_property: impl Into<String>) -> Self {
        Self {
            schema_attribute: schema_attribute.into(),
            idm_property: Some(idm_property.into()),
            transform_script: None,
            uid: false,
            multi_valued: false,
            send_on_create: true,
            send_on_update: true,
            disabled: false,
        }
    }

    /// Mapping computed by a script alone.
    pub fn scripted(schema_attribute: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            idm_property: None,
            transform_script: Some(script.into()),
            ..Self::new(schema_attribute, "")
        }
    }

    #[must_use]
    pub fn as_uid(mut self) -> Self {
        self.uid = true;
        self
    }

    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.transform_script = Some(script.into());
        self
    }

    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    #[must_use]
    pub fn create_only(mut self) -> Self {
        self.send_on_update = false;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    fn applies_to(&self, operation_type: ProvisioningOperationType) -> bool {
        if self.disabled {
            return false;
        }
        if self.uid {
            return true;
        }
        match operation_type {
            ProvisioningOperationType::Create => self.send_on_create,
            ProvisioningOperationType::Update => self.send_on_update,
            ProvisioningOperationType::Delete => false,
        }
    }
}

/// Target-side view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedObject {
    pub uid: String,
    pub attributes: Vec<Attribute>,
}

/// Evaluates attribute mappings.
#[derive(Debug, Clone, Default)]
pub struct MappingEngine {
    limits: ScriptLimits,
}

impl MappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    /// Create a sandboxed Rhai engine.
    fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();

        engine.set_max_operations(self.limits.max_operations);
        engine.set_max_call_levels(self.limits.max_call_stack_depth);
        engine.set_max_string_size(self.limits.max_string_size);
        engine.set_max_array_size(self.limits.max_array_size);
        engine.set_max_map_size(self.limits.max_map_size);
        engine.set_strict_variables(true);

        engine.register_fn("log_info", |msg: &str| {
            info!(script_log = %msg, "Transform script log");
        });
        engine.register_fn("log_warn", |msg: &str| {
            warn!(script_log = %msg, "Transform script warning");
        });

        engine
    }

    fn build_scope(attribute_value: &Value, entity: &Value) -> Result<Scope<'static>, String> {
        let mut scope = Scope::new();
        let value = rhai::serde::to_dynamic(attribute_value).map_err(|e| e.to_string())?;
        let entity = rhai::serde::to_dynamic(entity).map_err(|e| e.to_string())?;
        scope.push_dynamic("attributeValue", value);
        scope.push_constant_dynamic("entity", entity);
        Ok(scope)
    }

    /// Check a script for syntax errors.
    pub fn validate_script(&self, script: &str) -> Result<(), String> {
        let engine = self.create_engine();
        let scope = Self::build_scope(&Value::Null, &Value::Null)?;
        engine
            .compile_with_scope(&scope, script)
            .map(|_| ())
            .map_err(|e| format!("Compilation error: {e}"))
    }

    /// Run one transform script.
    pub fn run_script(
        &self,
        script: &str,
        attribute_value: &Value,
        entity: &Value,
    ) -> Result<Value, String> {
        let engine = self.create_engine();
        let mut scope = Self::build_scope(attribute_value, entity)?;
        let ast = engine
            .compile_with_scope(&scope, script)
            .map_err(|e| format!("Compilation error: {e}"))?;
        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| e.to_string())?;
        rhai::serde::from_dynamic::<Value>(&result).map_err(|e| e.to_string())
    }

    /// Evaluate mappings against an entity for one operation type.
    ///
    /// Exactly one enabled uid mapping must produce a non-empty value.
    /// Attributes without a value are left out on create and sent empty on
    /// update, which clears them on the target.
    pub fn evaluate(
        &self,
        mappings: &[AttributeMapping],
        entity: &Value,
        operation_type: ProvisioningOperationType,
    ) -> ProvisioningResult<MappedObject> {
        let mut uid = None;
        let mut attributes = Vec::new();

        for mapping in mappings.iter().filter(|m| m.applies_to(operation_type)) {
            let name = &mapping.schema_attribute;
            let mut value = mapping
                .idm_property
                .as_deref()
                .filter(|p| !p.is_empty())
                .and_then(|p| lookup(entity, p))
                .cloned()
                .unwrap_or(Value::Null);

            if let Some(script) = &mapping.transform_script {
                value = self
                    .run_script(script, &value, entity)
                    .map_err(|message| ProvisioningError::transform(name.clone(), message))?;
            }

            let values = to_values(&value)
                .map_err(|message| ProvisioningError::transform(name.clone(), message))?;

            if mapping.uid {
                if uid.is_some() {
                    return Err(ProvisioningError::transform(
                        name.clone(),
                        "more than one uid mapping",
                    ));
                }
                uid = values
                    .first()
                    .and_then(AttributeValue::to_plain_string)
                    .filter(|s| !s.is_empty());
                continue;
            }

            if !mapping.multi_valued && values.len() > 1 {
                return Err(ProvisioningError::transform(
                    name.clone(),
                    format!("{} values for a single-valued attribute", values.len()),
                ));
            }

            if values.is_empty() && operation_type == ProvisioningOperationType::Create {
                continue;
            }

            attributes.push(Attribute {
                name: name.clone(),
                values,
                multi_valued: mapping.multi_valued,
            });
        }

        let uid = uid.ok_or_else(|| ProvisioningError::MissingUid {
            attribute: mappings
                .iter()
                .find(|m| m.uid && !m.disabled)
                .map_or_else(|| "<none>".to_string(), |m| m.schema_attribute.clone()),
        })?;

        debug!(uid = %uid, attributes = attributes.len(), "Entity mapped");
        Ok(MappedObject { uid, attributes })
    }
}

/// Read a dotted path from a JSON value.
fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(entity, |current, segment| current.get(segment))
}

/// Flatten a mapped value into attribute values. `null` means no value, at the
/// top level or as an array item; nested arrays cannot be represented.
fn to_values(value: &Value) -> Result<Vec<AttributeValue>, String> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, item)| {
                AttributeValue::from_json(item)
                    .ok_or_else(|| format!("item {i} is a nested array"))
            })
            .collect(),
        other => Ok(AttributeValue::from_json(other).into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity() -> Value {
        json!({
            "username": "jdoe",
            "firstName": "John",
            "lastName": "Doe",
            "email": "john.doe@example.com",
            "roles": ["admins", "users"],
            "manager": null,
            "address": { "city": "Prague" }
        })
    }

    fn mappings() -> Vec<AttributeMapping> {
        vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::new("mail", "email"),
            AttributeMapping::new("groups", "roles").multi_valued(),
            AttributeMapping::new("l", "address.city"),
            AttributeMapping::new("manager", "manager"),
            AttributeMapping::scripted("cn", r#"entity.firstName + " " + entity.lastName"#),
            AttributeMapping::new("initialPassword", "username").create_only(),
        ]
    }

    fn values_of<'a>(mapped: &'a MappedObject, name: &str) -> Option<&'a Vec<AttributeValue>> {
        mapped
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.values)
    }

    #[test]
    fn test_evaluate_create() {
        let mapped = MappingEngine::new()
            .evaluate(&mappings(), &entity(), ProvisioningOperationType::Create)
            .unwrap();

        assert_eq!(mapped.uid, "jdoe");
        assert!(values_of(&mapped, "__NAME__").is_none());
        assert_eq!(
            values_of(&mapped, "mail").unwrap()[0].as_string(),
            Some("john.doe@example.com")
        );
        assert_eq!(values_of(&mapped, "groups").unwrap().len(), 2);
        assert_eq!(values_of(&mapped, "l").unwrap()[0].as_string(), Some("Prague"));
        assert_eq!(values_of(&mapped, "cn").unwrap()[0].as_string(), Some("John Doe"));
        // Absent values are not sent on create.
        assert!(values_of(&mapped, "manager").is_none());
        assert!(values_of(&mapped, "initialPassword").is_some());
    }

    #[test]
    fn test_evaluate_update_clears_and_skips_create_only() {
        let mapped = MappingEngine::new()
            .evaluate(&mappings(), &entity(), ProvisioningOperationType::Update)
            .unwrap();

        assert!(values_of(&mapped, "manager").unwrap().is_empty());
        assert!(values_of(&mapped, "initialPassword").is_none());
    }

    #[test]
    fn test_evaluate_delete_maps_uid_only() {
        let mapped = MappingEngine::new()
            .evaluate(&mappings(), &entity(), ProvisioningOperationType::Delete)
            .unwrap();
        assert_eq!(mapped.uid, "jdoe");
        assert!(mapped.attributes.is_empty());
    }

    #[test]
    fn test_script_sees_attribute_value() {
        let mappings = vec![
            AttributeMapping::new("__NAME__", "username")
                .as_uid()
                .with_script("attributeValue.to_upper()"),
        ];
        let mapped = MappingEngine::new()
            .evaluate(&mappings, &entity(), ProvisioningOperationType::Create)
            .unwrap();
        assert_eq!(mapped.uid, "JDOE");
    }

    #[test]
    fn test_missing_uid_is_an_error() {
        let mappings = vec![
            AttributeMapping::new("__NAME__", "missing").as_uid(),
            AttributeMapping::new("mail", "email"),
        ];
        let err = MappingEngine::new()
            .evaluate(&mappings, &entity(), ProvisioningOperationType::Create)
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::MissingUid { .. }));
    }

    #[test]
    fn test_script_failure_names_attribute() {
        let mappings = vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::scripted("mail", "undefinedVariable + 1"),
        ];
        let err = MappingEngine::new()
            .evaluate(&mappings, &entity(), ProvisioningOperationType::Create)
            .unwrap_err();
        match err {
            ProvisioningError::Transform { attribute, .. } => assert_eq!(attribute, "mail"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_runaway_script_is_stopped() {
        let engine = MappingEngine::with_limits(ScriptLimits {
            max_operations: 1_000,
            ..ScriptLimits::default()
        });
        let result = engine.run_script("loop { }", &Value::Null, &entity());
        assert!(result.is_err());
    }

    #[test]
    fn test_single_valued_rejects_many() {
        let mappings = vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::new("groups", "roles"),
        ];
        let err = MappingEngine::new()
            .evaluate(&mappings, &entity(), ProvisioningOperationType::Create)
            .unwrap_err();
        assert_eq!(err.error_code(), "TRANSFORMATION_FAILED");
    }

    #[test]
    fn test_nested_array_rejected_and_null_items_skipped() {
        let entity = json!({
            "username": "jdoe",
            "roles": ["admins", null, "users"],
            "grid": ["a", ["b", "c"]]
        });
        let engine = MappingEngine::new();

        let mappings = vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::new("groups", "roles").multi_valued(),
        ];
        let mapped = engine
            .evaluate(&mappings, &entity, ProvisioningOperationType::Create)
            .unwrap();
        let groups = values_of(&mapped, "groups").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].as_string(), Some("users"));

        let mappings = vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::new("grid", "grid").multi_valued(),
        ];
        let err = engine
            .evaluate(&mappings, &entity, ProvisioningOperationType::Create)
            .unwrap_err();
        match err {
            ProvisioningError::Transform { attribute, message } => {
                assert_eq!(attribute, "grid");
                assert!(message.contains("nested array"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_disabled_mapping_ignored() {
        let mappings = vec![
            AttributeMapping::new("__NAME__", "username").as_uid(),
            AttributeMapping::new("mail", "email").disabled(),
        ];
        let mapped = MappingEngine::new()
            .evaluate(&mappings, &entity(), ProvisioningOperationType::Update)
            .unwrap();
        assert!(mapped.attributes.is_empty());
    }

    #[test]
    fn test_validate_script() {
        let engine = MappingEngine::new();
        assert!(engine.validate_script("attributeValue + entity.x").is_ok());
        assert!(engine.validate_script("let = ;").is_err());
    }
}
