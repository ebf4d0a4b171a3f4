use async_trait::async_trait;
use tracing::debug;

use idm_ic::facade::ConnectorFacade;

use super::{ProcessOutcome, ProvisioningProcessor};
use crate::error::ProvisioningResult;
use crate::operation::ProvisioningOperation;
use crate::system::SystemSnapshot;
use crate::types::ProvisioningOperationType;

/// Replaces the listed attributes on the target object.
///
/// An operation without attributes has nothing to send and never reaches
/// the connector.
#[derive(Debug, Clone)]
pub struct UpdateProcessor {
    facade: ConnectorFacade,
}

impl UpdateProcessor {
    pub fn new(facade: ConnectorFacade) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl ProvisioningProcessor for UpdateProcessor {
    fn operation_type(&self) -> ProvisioningOperationType {
        ProvisioningOperationType::Update
    }

    async fn process_internal(
        &self,
        operation: &ProvisioningOperation,
        system: &SystemSnapshot,
    ) -> ProvisioningResult<ProcessOutcome> {
        if operation.attributes.is_empty() {
            debug!(operation_id = %operation.id, "No attributes to update");
            return Ok(ProcessOutcome::NoChange);
        }

        let uid = self
            .facade
            .update_object(
                &system.connector_key,
                system.configuration(),
                &operation.object_class,
                &operation.uid(),
                &operation.attributes,
            )
            .await?;

        Ok(ProcessOutcome::Executed { uid: Some(uid) })
    }
}
