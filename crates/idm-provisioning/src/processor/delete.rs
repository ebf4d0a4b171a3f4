use async_trait::async_trait;
use tracing::debug;

use idm_ic::facade::ConnectorFacade;

use super::{ProcessOutcome, ProvisioningProcessor};
use crate::error::ProvisioningResult;
use crate::operation::ProvisioningOperation;
use crate::system::SystemSnapshot;
use crate::types::ProvisioningOperationType;

/// Deletes the target object.
///
/// The uid is rebuilt from the stored identifier alone, with no name or
/// revision hints, and sent in a single `delete_object` call. A target that
/// reports the object missing fails the operation like any other error.
#[derive(Debug, Clone)]
pub struct DeleteProcessor {
    facade: ConnectorFacade,
}

impl DeleteProcessor {
    pub fn new(facade: ConnectorFacade) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl ProvisioningProcessor for DeleteProcessor {
    fn operation_type(&self) -> ProvisioningOperationType {
        ProvisioningOperationType::Delete
    }

    async fn process_internal(
        &self,
        operation: &ProvisioningOperation,
        system: &SystemSnapshot,
    ) -> ProvisioningResult<ProcessOutcome> {
        let uid = operation.uid();
        debug!(operation_id = %operation.id, uid = %uid, "Deleting object");

        self.facade
            .delete_object(
                &system.connector_key,
                system.configuration(),
                &operation.object_class,
                &uid,
            )
            .await?;

        Ok(ProcessOutcome::Executed { uid: Some(uid) })
    }
}
