//! Provisioning dispatcher
//!
//! Runs the steps shared by every operation type around the type-specific
//! [`ProvisioningProcessor`]:
//!
//! 1. refuse the operation if the system is disabled, readonly or blocks the type
//! 2. pick the processor registered for the operation type
//! 3. mark the operation running and count the attempt
//! 4. run the processor and record the outcome on the operation
//!
//! Failures are recorded and returned, never retried here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use idm_ic::facade::ConnectorFacade;
use idm_ic::object::UidAttribute;

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::operation::{OperationResult, ProvisioningOperation};
use crate::processor::{
    CreateProcessor, DeleteProcessor, ProcessOutcome, ProvisioningProcessor, UpdateProcessor,
};
use crate::system::{SuspendReason, SystemSnapshot};
use crate::types::{OperationState, ProvisioningOperationType};

/// Result of dispatching one operation.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The processor finished; `executed` is false when nothing was sent.
    Completed {
        uid: Option<UidAttribute>,
        executed: bool,
    },
    /// The processor or its connector failed.
    Failed(ProvisioningError),
    /// The system refused the operation; no connector was called.
    Suspended(SuspendReason),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&ProvisioningError> {
        match self {
            DispatchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Routes operations to their processor.
#[derive(Default)]
pub struct ProvisioningDispatcher {
    processors: HashMap<ProvisioningOperationType, Arc<dyn ProvisioningProcessor>>,
}

impl ProvisioningDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with the create, update and delete processors over `facade`.
    pub fn with_default_processors(facade: ConnectorFacade) -> Self {
        let mut processors: HashMap<ProvisioningOperationType, Arc<dyn ProvisioningProcessor>> =
            HashMap::new();
        processors.insert(
            ProvisioningOperationType::Create,
            Arc::new(CreateProcessor::new(facade.clone())),
        );
        processors.insert(
            ProvisioningOperationType::Update,
            Arc::new(UpdateProcessor::new(facade.clone())),
        );
        processors.insert(
            ProvisioningOperationType::Delete,
            Arc::new(DeleteProcessor::new(facade)),
        );
        Self { processors }
    }

    /// Register a processor; one per operation type.
    pub fn register(&mut self, processor: Arc<dyn ProvisioningProcessor>) -> ProvisioningResult<()> {
        let operation_type = processor.operation_type();
        if self.processors.contains_key(&operation_type) {
            return Err(ProvisioningError::DuplicateProcessor { operation_type });
        }
        self.processors.insert(operation_type, processor);
        Ok(())
    }

    pub fn processor(
        &self,
        operation_type: ProvisioningOperationType,
    ) -> ProvisioningResult<&Arc<dyn ProvisioningProcessor>> {
        self.processors
            .get(&operation_type)
            .ok_or(ProvisioningError::ProcessorNotFound { operation_type })
    }

    /// Dispatch one operation against a system snapshot.
    #[instrument(
        skip_all,
        fields(
            operation_id = %operation.id,
            operation_type = %operation.operation_type,
            system = %system.name,
            uid = %operation.system_entity_uid,
        )
    )]
    pub async fn dispatch(
        &self,
        operation: &mut ProvisioningOperation,
        system: &SystemSnapshot,
    ) -> DispatchOutcome {
        if operation.system_id != system.id {
            let error = ProvisioningError::invalid_operation(format!(
                "operation targets system {} but was dispatched to {}",
                operation.system_id, system.id
            ));
            return Self::fail(operation, error, Instant::now());
        }

        if let Some(reason) = system.suspend_reason(operation.operation_type) {
            info!(reason = %reason, "Operation not executed");
            operation.complete(OperationResult::suspended(reason));
            return DispatchOutcome::Suspended(reason);
        }

        let processor = match self.processor(operation.operation_type) {
            Ok(p) => Arc::clone(p),
            Err(error) => return Self::fail(operation, error, Instant::now()),
        };

        operation.transition(OperationState::Running);
        operation.attempts += 1;
        let started = Instant::now();

        match processor.process_internal(operation, system).await {
            Ok(ProcessOutcome::Executed { uid }) => {
                let elapsed = started.elapsed();
                info!(
                    attempt = operation.attempts,
                    duration_ms = elapsed.as_millis() as u64,
                    "Operation executed"
                );
                operation.complete(OperationResult::executed(uid.clone(), elapsed));
                DispatchOutcome::Completed {
                    uid,
                    executed: true,
                }
            }
            Ok(ProcessOutcome::NoChange) => {
                operation.complete(OperationResult::no_change(started.elapsed()));
                DispatchOutcome::Completed {
                    uid: None,
                    executed: false,
                }
            }
            Err(error) => Self::fail(operation, error, started),
        }
    }

    fn fail(
        operation: &mut ProvisioningOperation,
        error: ProvisioningError,
        started: Instant,
    ) -> DispatchOutcome {
        warn!(
            error_code = error.error_code(),
            transient = error.is_transient(),
            error = %error,
            "Operation failed"
        );
        operation.complete(OperationResult::exception(&error, started.elapsed()));
        DispatchOutcome::Failed(error)
    }
}

impl fmt::Debug for ProvisioningDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.processors.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("ProvisioningDispatcher")
            .field("processors", &types)
            .finish()
    }
}
