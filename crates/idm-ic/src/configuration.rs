//! Connector configuration
//!
//! Vendor-neutral configuration properties handed to a connector service on
//! every call. A system record owns its configuration; the provisioning core
//! receives an immutable snapshot per dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IcError, IcResult};

/// Replacement for confidential values in log output.
pub const REDACTED: &str = "********";

/// A single configuration property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationProperty {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub help_message: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub confidential: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub value_type: String,
}

impl ConfigurationProperty {
    /// Create a property with a value and defaults for everything else.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            help_message: String::new(),
            value: value.into(),
            confidential: false,
            required: false,
            order: 0,
            value_type: String::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn confidential(mut self) -> Self {
        self.confidential = true;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_help_message(mut self, help_message: impl Into<String>) -> Self {
        self.help_message = help_message.into();
        self
    }

    #[must_use]
    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }

    /// True if the value is null or an empty string.
    pub fn is_unset(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Configuration of one connector instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorConfiguration {
    properties: Vec<ConfigurationProperty>,
}

impl ConnectorConfiguration {
    pub fn new(properties: Vec<ConfigurationProperty>) -> Self {
        Self { properties }
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[ConfigurationProperty] {
        &self.properties
    }

    /// Properties sorted by `order`; ties keep declaration order.
    pub fn ordered_properties(&self) -> Vec<&ConfigurationProperty> {
        let mut ordered: Vec<_> = self.properties.iter().collect();
        ordered.sort_by_key(|p| p.order);
        ordered
    }

    pub fn property(&self, name: &str) -> Option<&ConfigurationProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.property(name).map(|p| &p.value)
    }

    /// Add a property, replacing any property with the same name.
    #[must_use]
    pub fn with_property(mut self, property: ConfigurationProperty) -> Self {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }

    /// Set the value of a property, adding a plain property if absent.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self
                .properties
                .push(ConfigurationProperty::new(name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Fail if any required property has no value.
    pub fn validate(&self) -> IcResult<()> {
        let missing: Vec<&str> = self
            .properties
            .iter()
            .filter(|p| p.required && p.is_unset())
            .map(|p| p.name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(IcError::invalid_configuration(format!(
                "required properties without value: {}",
                missing.join(", ")
            )))
        }
    }

    /// Copy safe for logging: confidential values are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let properties = self
            .properties
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if p.confidential && !p.is_unset() {
                    p.value = Value::String(REDACTED.to_string());
                }
                p
            })
            .collect();
        Self { properties }
    }
}

impl FromIterator<ConfigurationProperty> for ConnectorConfiguration {
    fn from_iter<T: IntoIterator<Item = ConfigurationProperty>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
