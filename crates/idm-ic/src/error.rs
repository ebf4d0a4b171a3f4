//! Connector layer error types
//!
//! Error definitions with transient/permanent classification for retry logic.

use std::fmt;

use thiserror::Error;

use crate::key::ConnectorKey;
use crate::native::NativeError;
use crate::object::ObjectClass;

/// Connector operation, recorded on native failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcOperation {
    Create,
    Update,
    Delete,
    Read,
    Search,
    Test,
    Schema,
}

impl IcOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IcOperation::Create => "create",
            IcOperation::Update => "update",
            IcOperation::Delete => "delete",
            IcOperation::Read => "read",
            IcOperation::Search => "search",
            IcOperation::Test => "test",
            IcOperation::Schema => "schema",
        }
    }
}

impl fmt::Display for IcOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that can occur in the connector layer.
#[derive(Debug, Error)]
pub enum IcError {
    /// Configuration missing, empty or incomplete.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A service is already registered for this framework.
    #[error("connector implementation already registered: {framework}")]
    DuplicateImplementation { framework: String },

    /// A bundle with the same full name is already installed.
    #[error("connector already installed: {full_name}")]
    DuplicateConnector { full_name: String },

    #[error("connector implementation not found: {framework}")]
    ImplementationNotFound { framework: String },

    #[error("connector not found: {key}")]
    ConnectorNotFound { key: ConnectorKey },

    /// The native connector failed.
    #[error("{operation} on {key} failed{}: {source}", class_suffix(.object_class))]
    Connector {
        operation: IcOperation,
        key: ConnectorKey,
        object_class: Option<ObjectClass>,
        #[source]
        source: NativeError,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn class_suffix(object_class: &Option<ObjectClass>) -> String {
    object_class
        .as_ref()
        .map(|c| format!(" for {c}"))
        .unwrap_or_default()
}

impl IcError {
    /// Check if this error is transient and the operation could be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            IcError::Connector { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            IcError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            IcError::DuplicateImplementation { .. } => "DUPLICATE_IMPLEMENTATION",
            IcError::DuplicateConnector { .. } => "DUPLICATE_CONNECTOR",
            IcError::ImplementationNotFound { .. } => "IMPLEMENTATION_NOT_FOUND",
            IcError::ConnectorNotFound { .. } => "CONNECTOR_NOT_FOUND",
            IcError::Connector { source, .. } => source.error_code(),
            IcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        IcError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Wrap a native failure with the operation context.
    pub fn connector(
        operation: IcOperation,
        key: &ConnectorKey,
        object_class: Option<&ObjectClass>,
        source: NativeError,
    ) -> Self {
        IcError::Connector {
            operation,
            key: key.clone(),
            object_class: object_class.cloned(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        IcError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IcError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for connector layer operations.
pub type IcResult<T> = Result<T, IcError>;
