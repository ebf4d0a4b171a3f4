//! Target system snapshot
//!
//! The part of a system record the dispatcher needs: connector key,
//! configuration and the flags that stop provisioning. Callers build one
//! snapshot per dispatch; nothing here changes during a call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use idm_ic::configuration::ConnectorConfiguration;
use idm_ic::key::ConnectorKey;

use crate::ids::SystemId;
use crate::types::ProvisioningOperationType;

/// Operation types blocked on a system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedOperation {
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl BlockedOperation {
    pub fn is_blocked(&self, operation_type: ProvisioningOperationType) -> bool {
        match operation_type {
            ProvisioningOperationType::Create => self.create,
            ProvisioningOperationType::Update => self.update,
            ProvisioningOperationType::Delete => self.delete,
        }
    }

    pub fn any(&self) -> bool {
        self.create || self.update || self.delete
    }
}

/// Why a dispatch was refused without calling a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "operation_type")]
pub enum SuspendReason {
    /// The system is disabled.
    Disabled,
    /// The system accepts no writes.
    Readonly,
    /// This operation type is blocked on the system.
    Blocked(ProvisioningOperationType),
}

impl SuspendReason {
    pub fn error_code(&self) -> &'static str {
        match self {
            SuspendReason::Disabled => "SYSTEM_DISABLED",
            SuspendReason::Readonly => "SYSTEM_READONLY",
            SuspendReason::Blocked(_) => "OPERATION_BLOCKED",
        }
    }
}

impl fmt::Display for SuspendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendReason::Disabled => write!(f, "system is disabled"),
            SuspendReason::Readonly => write!(f, "system is readonly"),
            SuspendReason::Blocked(t) => write!(f, "{t} operations are blocked on the system"),
        }
    }
}

/// Immutable view of a target system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Generated when absent from serialized input.
    #[serde(default = "SystemId::new")]
    pub id: SystemId,
    pub name: String,
    pub connector_key: ConnectorKey,
    /// `None` when the system has no connector configuration.
    #[serde(default)]
    pub configuration: Option<Arc<ConnectorConfiguration>>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub blocked: BlockedOperation,
}

impl SystemSnapshot {
    pub fn new(
        name: impl Into<String>,
        connector_key: ConnectorKey,
        configuration: ConnectorConfiguration,
    ) -> Self {
        Self {
            id: SystemId::new(),
            name: name.into(),
            connector_key,
            configuration: Some(Arc::new(configuration)),
            readonly: false,
            disabled: false,
            blocked: BlockedOperation::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: SystemId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_blocked(mut self, blocked: BlockedOperation) -> Self {
        self.blocked = blocked;
        self
    }

    #[must_use]
    pub fn without_configuration(mut self) -> Self {
        self.configuration = None;
        self
    }

    pub fn configuration(&self) -> Option<&ConnectorConfiguration> {
        self.configuration.as_deref()
    }

    /// Reason this system refuses an operation type, if it does.
    ///
    /// Checked in order: disabled, readonly, blocked.
    pub fn suspend_reason(&self, operation_type: ProvisioningOperationType) -> Option<SuspendReason> {
        if self.disabled {
            Some(SuspendReason::Disabled)
        } else if self.readonly {
            Some(SuspendReason::Readonly)
        } else if self.blocked.is_blocked(operation_type) {
            Some(SuspendReason::Blocked(operation_type))
        } else {
            None
        }
    }
}
