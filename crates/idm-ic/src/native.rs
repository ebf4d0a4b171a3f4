//! Connector-native layer
//!
//! The representation a connector bundle speaks. Bundles implement
//! [`NativeConnectorFactory`] and [`NativeConnector`]; the
//! [`LocalConnectorService`](crate::local::LocalConnectorService) converts the
//! vendor-neutral model to and from these types around every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::object::{AttributeValue, Filter};

/// A native attribute: name plus ordered values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeAttribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
    /// Declared multi-valued, whatever the current value count.
    #[serde(default)]
    pub multi_valued: bool,
}

impl NativeAttribute {
    pub fn new(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
            multi_valued: false,
        }
    }

    pub fn multi_valued(mut self, multi_valued: bool) -> Self {
        self.multi_valued = multi_valued;
        self
    }
}

/// A native unique identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeUid {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl NativeUid {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            revision: None,
        }
    }

    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

impl fmt::Display for NativeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// An object as returned by a native connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeConnectorObject {
    pub object_class: String,
    pub uid: NativeUid,
    pub attributes: Vec<NativeAttribute>,
}

/// A configuration property as a bundle declares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeConfigurationProperty {
    pub name: String,
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

/// Errors raised by native connectors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NativeError {
    #[error("unknown uid: {0}")]
    UnknownUid(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid credential")]
    InvalidCredential,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid attribute '{0}'")]
    InvalidAttribute(String),

    #[error("{0}")]
    Other(String),
}

impl NativeError {
    /// Only connectivity problems are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, NativeError::ConnectionFailed(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            NativeError::UnknownUid(_) => "UNKNOWN_UID",
            NativeError::AlreadyExists(_) => "ALREADY_EXISTS",
            NativeError::InvalidCredential => "INVALID_CREDENTIAL",
            NativeError::ConnectionFailed(_) => "CONNECTION_FAILED",
            NativeError::InvalidConfiguration(_) => "INVALID_CONFIG",
            NativeError::InvalidAttribute(_) => "INVALID_ATTRIBUTE",
            NativeError::Other(_) => "CONNECTOR_ERROR",
        }
    }
}

/// Result type for native connector calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// A configured connector instance.
#[async_trait]
pub trait NativeConnector: Send + Sync {
    /// Create an object and return its uid.
    async fn create(
        &self,
        object_class: &str,
        attributes: Vec<NativeAttribute>,
    ) -> NativeResult<NativeUid>;

    /// Replace the listed attributes; attributes not listed are left alone.
    async fn update(
        &self,
        object_class: &str,
        uid: &NativeUid,
        attributes: Vec<NativeAttribute>,
    ) -> NativeResult<NativeUid>;

    async fn delete(&self, object_class: &str, uid: &NativeUid) -> NativeResult<()>;

    async fn get(
        &self,
        object_class: &str,
        uid: &NativeUid,
    ) -> NativeResult<Option<NativeConnectorObject>>;

    async fn search(
        &self,
        object_class: &str,
        filter: Option<&Filter>,
    ) -> NativeResult<Vec<NativeConnectorObject>>;

    /// Check connectivity to the target.
    async fn test(&self) -> NativeResult<()>;

    /// Object classes the target supports.
    async fn schema(&self) -> NativeResult<Vec<String>>;
}

/// Produces configured connector instances for one bundle.
pub trait NativeConnectorFactory: Send + Sync {
    /// Properties the bundle understands, with default values.
    fn default_configuration(&self) -> Vec<NativeConfigurationProperty>;

    /// Build a connector for the given configuration.
    fn create(
        &self,
        properties: &[NativeConfigurationProperty],
    ) -> NativeResult<Arc<dyn NativeConnector>>;
}

/// An installable connector bundle.
#[derive(Clone)]
pub struct NativeConnectorInfo {
    pub bundle_name: String,
    pub bundle_version: String,
    pub connector_name: String,
    pub display_name: String,
    pub factory: Arc<dyn NativeConnectorFactory>,
}

impl NativeConnectorInfo {
    pub fn new(
        bundle_name: impl Into<String>,
        bundle_version: impl Into<String>,
        connector_name: impl Into<String>,
        factory: Arc<dyn NativeConnectorFactory>,
    ) -> Self {
        let connector_name = connector_name.into();
        Self {
            bundle_name: bundle_name.into(),
            bundle_version: bundle_version.into(),
            display_name: connector_name.clone(),
            connector_name,
            factory,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// `bundle:connector:version`, matching [`ConnectorKey::full_name`](crate::key::ConnectorKey::full_name).
    pub fn full_name(&self) -> String {
        format!(
            "{}:{}:{}",
            self.bundle_name, self.connector_name, self.bundle_version
        )
    }
}

impl fmt::Debug for NativeConnectorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeConnectorInfo")
            .field("bundle_name", &self.bundle_name)
            .field("bundle_version", &self.bundle_version)
            .field("connector_name", &self.connector_name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_classification() {
        assert!(NativeError::ConnectionFailed("timeout".into()).is_transient());
        assert!(!NativeError::UnknownUid("x".into()).is_transient());
        assert!(!NativeError::InvalidCredential.is_transient());
        assert_eq!(
            NativeError::AlreadyExists("jdoe".into()).error_code(),
            "ALREADY_EXISTS"
        );
    }

    #[test]
    fn test_native_uid_revision() {
        let uid = NativeUid::new("42").with_revision("7");
        assert_eq!(uid.to_string(), "42");
        assert_eq!(uid.revision.as_deref(), Some("7"));
    }
}
