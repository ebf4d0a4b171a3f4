//! Vendor-neutral object model
//!
//! Object classes, attributes, UIDs, connector objects and search filters
//! exchanged between the provisioning core and connector services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of the distinguished UID attribute.
pub const UID_NAME: &str = "__UID__";

/// Name of the naming attribute (the identifier a new object is created with).
pub const NAME_NAME: &str = "__NAME__";

/// Tag identifying the kind of remote object (account, group, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectClass(String);

impl ObjectClass {
    pub const ACCOUNT_NAME: &'static str = "__ACCOUNT__";
    pub const GROUP_NAME: &'static str = "__GROUP__";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The account object class.
    #[must_use]
    pub fn account() -> Self {
        Self::new(Self::ACCOUNT_NAME)
    }

    /// The group object class.
    #[must_use]
    pub fn group() -> Self {
        Self::new(Self::GROUP_NAME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectClass {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// A floating-point value.
    Float(f64),
    /// Binary data.
    Binary(Vec<u8>),
    /// Structured value.
    Object(serde_json::Map<String, Value>),
}

impl AttributeValue {
    /// Get as a string if this is a string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Render scalar values as plain text; binary and structured values have none.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Boolean(b) => Some(b.to_string()),
            AttributeValue::Float(f) => Some(f.to_string()),
            AttributeValue::Binary(_) | AttributeValue::Object(_) => None,
        }
    }

    /// Convert a JSON value. `null` and arrays have no single-value form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Array(_) => None,
            Value::String(s) => Some(AttributeValue::String(s.clone())),
            Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(AttributeValue::Integer)
                .or_else(|| n.as_f64().map(AttributeValue::Float)),
            Value::Object(map) => Some(AttributeValue::Object(map.clone())),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

/// A named attribute with an ordered list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<AttributeValue>,
    #[serde(default)]
    pub multi_valued: bool,
}

impl Attribute {
    /// Single-valued attribute.
    pub fn single(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
            multi_valued: false,
        }
    }

    /// Multi-valued attribute; value order is kept.
    pub fn multi<V: Into<AttributeValue>>(name: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            multi_valued: true,
        }
    }

    /// Attribute with no values (clears the attribute on update).
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            multi_valued: false,
        }
    }

    /// First value, if any.
    pub fn single_value(&self) -> Option<&AttributeValue> {
        self.values.first()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The distinguished identifier of a remote object.
///
/// `name` and `revision` are hints a connector may return; a UID built only
/// from a stored identifier leaves both unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UidAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl UidAttribute {
    pub fn new(name: Option<String>, value: impl Into<String>, revision: Option<String>) -> Self {
        Self {
            name,
            value: value.into(),
            revision,
        }
    }

    /// UID carrying only a value, without native hints.
    pub fn from_value(value: impl Into<String>) -> Self {
        Self::new(None, value, None)
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for UidAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// An object read from or written to a target system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorObject {
    pub object_class: ObjectClass,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl ConnectorObject {
    pub fn new(object_class: ObjectClass, attributes: Vec<Attribute>) -> Self {
        Self {
            object_class,
            attributes,
        }
    }

    /// Find an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The object's UID, read from `__UID__` and falling back to `__NAME__`.
    pub fn uid(&self) -> Option<String> {
        self.attribute(UID_NAME)
            .or_else(|| self.attribute(NAME_NAME))
            .and_then(Attribute::single_value)
            .and_then(AttributeValue::to_plain_string)
    }
}

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Some value of the attribute equals `value`.
    Equals { attribute: String, value: String },
    /// Some value of the attribute contains `value`.
    Contains { attribute: String, value: String },
    /// Some value of the attribute starts with `value`.
    StartsWith { attribute: String, value: String },
    /// The attribute has at least one value.
    Present { attribute: String },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
    Not { filter: Box<Filter> },
}

impl Filter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Negate a filter.
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    #[must_use]
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Evaluate the filter against an object in memory.
    ///
    /// Used by connectors whose target has no query language of its own.
    pub fn matches(&self, object: &ConnectorObject) -> bool {
        let values_of = |attribute: &str| -> Vec<String> {
            object
                .attribute(attribute)
                .map(|a| {
                    a.values
                        .iter()
                        .filter_map(AttributeValue::to_plain_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        match self {
            Filter::Equals { attribute, value } => values_of(attribute).iter().any(|v| v == value),
            Filter::Contains { attribute, value } => values_of(attribute)
                .iter()
                .any(|v| v.contains(value.as_str())),
            Filter::StartsWith { attribute, value } => values_of(attribute)
                .iter()
                .any(|v| v.starts_with(value.as_str())),
            Filter::Present { attribute } => object
                .attribute(attribute)
                .is_some_and(|a| !a.values.is_empty()),
            Filter::And { filters } => filters.iter().all(|f| f.matches(object)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(object)),
            Filter::Not { filter } => !filter.matches(object),
        }
    }
}
