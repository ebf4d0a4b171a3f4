//! Per-type provisioning processors
//!
//! One [`ProvisioningProcessor`] exists per [`ProvisioningOperationType`].
//! The [`ProvisioningDispatcher`](crate::dispatcher::ProvisioningDispatcher)
//! owns the common steps (suspension checks, state, timing, result); a
//! processor only performs the connector call its type needs.

mod create;
mod delete;
mod update;

pub use create::CreateProcessor;
pub use delete::DeleteProcessor;
pub use update::UpdateProcessor;

use async_trait::async_trait;

use idm_ic::object::UidAttribute;

use crate::error::ProvisioningResult;
use crate::operation::ProvisioningOperation;
use crate::system::SystemSnapshot;
use crate::types::ProvisioningOperationType;

/// What a processor did on the target.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The connector was called; `uid` is the object's uid afterwards, when known.
    Executed { uid: Option<UidAttribute> },
    /// Nothing needed sending.
    NoChange,
}

/// Strategy for one operation type.
#[async_trait]
pub trait ProvisioningProcessor: Send + Sync {
    /// The operation type this processor handles.
    fn operation_type(&self) -> ProvisioningOperationType;

    /// Perform the type-specific connector call.
    ///
    /// Errors are returned untouched; the dispatcher records them.
    async fn process_internal(
        &self,
        operation: &ProvisioningOperation,
        system: &SystemSnapshot,
    ) -> ProvisioningResult<ProcessOutcome>;
}
