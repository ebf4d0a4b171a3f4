//! Provisioning enums

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change a provisioning operation makes on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningOperationType {
    /// Create a new object in the target system
    Create,
    /// Update an existing object in the target system
    Update,
    /// Delete an object from the target system
    Delete,
}

impl ProvisioningOperationType {
    pub const ALL: [ProvisioningOperationType; 3] = [
        ProvisioningOperationType::Create,
        ProvisioningOperationType::Update,
        ProvisioningOperationType::Delete,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningOperationType::Create => "create",
            ProvisioningOperationType::Update => "update",
            ProvisioningOperationType::Delete => "delete",
        }
    }
}

impl fmt::Display for ProvisioningOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProvisioningOperationType {
    type Err = ParseOperationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(ProvisioningOperationType::Create),
            "update" => Ok(ProvisioningOperationType::Update),
            "delete" => Ok(ProvisioningOperationType::Delete),
            _ => Err(ParseOperationTypeError(s.to_string())),
        }
    }
}

/// Error parsing operation type from string.
#[derive(Debug, Clone)]
pub struct ParseOperationTypeError(String);

impl fmt::Display for ParseOperationTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid operation type '{}', expected one of: create, update, delete",
            self.0
        )
    }
}

impl std::error::Error for ParseOperationTypeError {}

/// Lifecycle state of a provisioning operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Recorded, not yet dispatched
    #[default]
    Created,
    /// A processor is executing it
    Running,
    /// The target was changed
    Executed,
    /// The processor failed
    Exception,
    /// Dispatched but nothing was sent (no change, or the system refused it)
    NotExecuted,
}

impl OperationState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Created => "created",
            OperationState::Running => "running",
            OperationState::Executed => "executed",
            OperationState::Exception => "exception",
            OperationState::NotExecuted => "not_executed",
        }
    }

    /// Dispatch has finished with the operation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Executed | OperationState::Exception | OperationState::NotExecuted
        )
    }

    /// The operation may be submitted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationState::Exception | OperationState::NotExecuted)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationState {
    type Err = ParseOperationStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(OperationState::Created),
            "running" => Ok(OperationState::Running),
            "executed" => Ok(OperationState::Executed),
            "exception" => Ok(OperationState::Exception),
            "not_executed" => Ok(OperationState::NotExecuted),
            _ => Err(ParseOperationStateError(s.to_string())),
        }
    }
}

/// Error parsing operation state from string.
#[derive(Debug, Clone)]
pub struct ParseOperationStateError(String);

impl fmt::Display for ParseOperationStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation state '{}'", self.0)
    }
}

impl std::error::Error for ParseOperationStateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_parse() {
        assert_eq!(
            "DELETE".parse::<ProvisioningOperationType>().unwrap(),
            ProvisioningOperationType::Delete
        );
        for t in ProvisioningOperationType::ALL {
            assert_eq!(t.as_str().parse::<ProvisioningOperationType>().unwrap(), t);
        }
        let err = "rename".parse::<ProvisioningOperationType>().unwrap_err();
        assert!(err.to_string().contains("rename"));
    }

    #[test]
    fn test_operation_state_classification() {
        assert!(!OperationState::Created.is_terminal());
        assert!(!OperationState::Running.is_terminal());
        assert!(OperationState::Executed.is_terminal());
        assert!(!OperationState::Executed.is_retryable());
        assert!(OperationState::Exception.is_retryable());
        assert!(OperationState::NotExecuted.is_retryable());
    }

    #[test]
    fn test_operation_state_serde() {
        let json = serde_json::to_string(&OperationState::NotExecuted).unwrap();
        assert_eq!(json, "\"not_executed\"");
        assert_eq!(
            "not_executed".parse::<OperationState>().unwrap(),
            OperationState::NotExecuted
        );
    }
}
