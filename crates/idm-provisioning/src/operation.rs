//! Provisioning operation records
//!
//! A [`ProvisioningOperation`] describes one change to one object on one
//! system. The dispatcher mutates it in place (state, attempts, result);
//! persisting it is the caller's business.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idm_ic::object::{Attribute, ObjectClass, UidAttribute};

use crate::error::ProvisioningError;
use crate::ids::{OperationId, SystemId};
use crate::system::SuspendReason;
use crate::transform::MappedObject;
use crate::types::{OperationState, ProvisioningOperationType};

/// The object an operation targets: `(system, uid on that system)`.
///
/// Operations on one target must not run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey {
    pub system_id: SystemId,
    pub system_entity_uid: String,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.system_id, self.system_entity_uid)
    }
}

/// Outcome recorded on an operation after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub state: OperationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default)]
    pub transient: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<UidAttribute>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl OperationResult {
    pub fn executed(uid: Option<UidAttribute>, elapsed: Duration) -> Self {
        Self {
            state: OperationState::Executed,
            code: None,
            cause: None,
            transient: false,
            uid,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Dispatched, nothing to send.
    pub fn no_change(elapsed: Duration) -> Self {
        Self {
            state: OperationState::NotExecuted,
            code: Some("NO_CHANGE".to_string()),
            cause: None,
            transient: false,
            uid: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn suspended(reason: SuspendReason) -> Self {
        Self {
            state: OperationState::NotExecuted,
            code: Some(reason.error_code().to_string()),
            cause: Some(reason.to_string()),
            transient: false,
            uid: None,
            duration_ms: 0,
        }
    }

    pub fn exception(error: &ProvisioningError, elapsed: Duration) -> Self {
        Self {
            state: OperationState::Exception,
            code: Some(error.error_code().to_string()),
            cause: Some(error.to_string()),
            transient: error.is_transient(),
            uid: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// One provisioning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningOperation {
    pub id: OperationId,
    pub operation_type: ProvisioningOperationType,
    pub system_id: SystemId,
    /// Identifier of the object on the target system.
    pub system_entity_uid: String,
    /// Identity-side owner of the object, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_identifier: Option<String>,
    pub object_class: ObjectClass,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub state: OperationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl ProvisioningOperation {
    /// Create an operation in state `Created`.
    pub fn new(
        operation_type: ProvisioningOperationType,
        system_id: SystemId,
        system_entity_uid: impl Into<String>,
        object_class: ObjectClass,
        attributes: Vec<Attribute>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OperationId::new(),
            operation_type,
            system_id,
            system_entity_uid: system_entity_uid.into(),
            entity_identifier: None,
            object_class,
            attributes,
            state: OperationState::Created,
            result: None,
            attempts: 0,
            next_attempt: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a delete operation; deletes carry no attributes.
    pub fn delete(system_id: SystemId, system_entity_uid: impl Into<String>, object_class: ObjectClass) -> Self {
        Self::new(
            ProvisioningOperationType::Delete,
            system_id,
            system_entity_uid,
            object_class,
            Vec::new(),
        )
    }

    /// Build an operation from a mapped object.
    pub fn from_mapping(
        operation_type: ProvisioningOperationType,
        system_id: SystemId,
        object_class: ObjectClass,
        mapped: MappedObject,
    ) -> Self {
        let attributes = match operation_type {
            ProvisioningOperationType::Delete => Vec::new(),
            _ => mapped.attributes,
        };
        Self::new(operation_type, system_id, mapped.uid, object_class, attributes)
    }

    #[must_use]
    pub fn with_entity_identifier(mut self, entity_identifier: impl Into<String>) -> Self {
        self.entity_identifier = Some(entity_identifier.into());
        self
    }

    /// Move to `state` and touch `modified_at`.
    pub fn transition(&mut self, state: OperationState) {
        self.state = state;
        self.modified_at = Utc::now();
    }

    /// Record a dispatch outcome; the result's state becomes the operation state.
    pub fn complete(&mut self, result: OperationResult) {
        self.transition(result.state);
        self.result = Some(result);
    }

    pub fn target(&self) -> TargetKey {
        TargetKey {
            system_id: self.system_id,
            system_entity_uid: self.system_entity_uid.clone(),
        }
    }

    /// The stored uid, without native hints.
    pub fn uid(&self) -> UidAttribute {
        UidAttribute::from_value(self.system_entity_uid.clone())
    }
}
