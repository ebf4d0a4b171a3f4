//! Provisioning error types
//!
//! Error definitions with transient/permanent classification for retry planning.

use thiserror::Error;

use idm_ic::error::IcError;

use crate::types::ProvisioningOperationType;

/// Error that can occur while dispatching provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The connector layer failed.
    #[error("connector error: {0}")]
    Connector(#[from] IcError),

    /// A processor for this operation type is already registered.
    #[error("processor already registered for operation type {operation_type}")]
    DuplicateProcessor {
        operation_type: ProvisioningOperationType,
    },

    #[error("no processor registered for operation type {operation_type}")]
    ProcessorNotFound {
        operation_type: ProvisioningOperationType,
    },

    /// Attribute mapping or its transform script failed.
    #[error("transformation failed for attribute '{attribute}': {message}")]
    Transform { attribute: String, message: String },

    /// The mapping produced no identifier for the target object.
    #[error("uid mapping '{attribute}' produced no value")]
    MissingUid { attribute: String },

    /// The operation record cannot be processed as given.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProvisioningError {
    /// Check if this error is transient and the operation should be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ProvisioningError::Connector(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProvisioningError::Connector(e) => e.error_code(),
            ProvisioningError::DuplicateProcessor { .. } => "DUPLICATE_PROCESSOR",
            ProvisioningError::ProcessorNotFound { .. } => "PROCESSOR_NOT_FOUND",
            ProvisioningError::Transform { .. } => "TRANSFORMATION_FAILED",
            ProvisioningError::MissingUid { .. } => "MISSING_UID",
            ProvisioningError::InvalidOperation { .. } => "INVALID_OPERATION",
            ProvisioningError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    pub fn transform(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        ProvisioningError::Transform {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        ProvisioningError::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ProvisioningError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProvisioningError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for provisioning operations.
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

#[cfg(test)]
mod tests {
    use super::*;
    use idm_ic::error::IcOperation;
    use idm_ic::key::ConnectorKey;
    use idm_ic::native::NativeError;

    #[test]
    fn test_connector_errors_keep_classification() {
        let key = ConnectorKey::new("local", "memory", "1.0", "MemoryConnector");
        let transient: ProvisioningError = IcError::connector(
            IcOperation::Create,
            &key,
            None,
            NativeError::ConnectionFailed("refused".into()),
        )
        .into();
        assert!(transient.is_transient());
        assert_eq!(transient.error_code(), "CONNECTION_FAILED");

        let permanent: ProvisioningError = IcError::invalid_configuration("empty").into();
        assert!(permanent.is_permanent());
        assert_eq!(permanent.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_error_display() {
        let err = ProvisioningError::ProcessorNotFound {
            operation_type: ProvisioningOperationType::Update,
        };
        assert_eq!(
            err.to_string(),
            "no processor registered for operation type update"
        );

        let err = ProvisioningError::transform("mail", "undefined variable");
        assert_eq!(err.error_code(), "TRANSFORMATION_FAILED");
        assert!(err.is_permanent());
    }
}
