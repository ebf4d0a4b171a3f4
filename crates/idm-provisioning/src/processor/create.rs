use async_trait::async_trait;
use tracing::debug;

use idm_ic::facade::ConnectorFacade;

use super::{ProcessOutcome, ProvisioningProcessor};
use crate::error::ProvisioningResult;
use crate::operation::ProvisioningOperation;
use crate::system::SystemSnapshot;
use crate::types::ProvisioningOperationType;

/// Creates the target object from the operation's attributes.
#[derive(Debug, Clone)]
pub struct CreateProcessor {
    facade: ConnectorFacade,
}

impl CreateProcessor {
    pub fn new(facade: ConnectorFacade) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl ProvisioningProcessor for CreateProcessor {
    fn operation_type(&self) -> ProvisioningOperationType {
        ProvisioningOperationType::Create
    }

    async fn process_internal(
        &self,
        operation: &ProvisioningOperation,
        system: &SystemSnapshot,
    ) -> ProvisioningResult<ProcessOutcome> {
        let uid = self
            .facade
            .create_object(
                &system.connector_key,
                system.configuration(),
                &operation.object_class,
                &operation.attributes,
            )
            .await?;

        debug!(operation_id = %operation.id, uid = %uid, "Object created on target");
        Ok(ProcessOutcome::Executed { uid: Some(uid) })
    }
}
