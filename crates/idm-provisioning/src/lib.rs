//! # Provisioning Engine
//!
//! Turns identity changes into connector calls on target systems.
//!
//! A [`ProvisioningOperation`] names one change (create, update or delete) to
//! one object on one system. The [`ProvisioningDispatcher`] checks the
//! system's [`SystemSnapshot`], picks the processor registered for the
//! operation type and records the outcome on the operation. Processors reach
//! the connectors only through [`idm_ic::facade::ConnectorFacade`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────────────┐
//! │ MappingEngine│──►│  Executor    │──►│ Dispatcher │──►│ Create/Update/  │
//! │ (Rhai)       │   │ (per target) │   │            │   │ DeleteProcessor │
//! └──────────────┘   └──────────────┘   └────────────┘   └────────┬────────┘
//!                                                                 ▼
//!                                                        ┌─────────────────┐
//!                                                        │ ConnectorFacade │
//!                                                        └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use idm_provisioning::{ProvisioningDispatcher, ProvisioningOperation, SystemSnapshot};
//!
//! let dispatcher = ProvisioningDispatcher::with_default_processors(facade);
//! let mut operation = ProvisioningOperation::delete(system.id, "jdoe", ObjectClass::account());
//! let outcome = dispatcher.dispatch(&mut operation, &system).await;
//! ```

pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod ids;
pub mod operation;
pub mod processor;
pub mod retry;
pub mod system;
pub mod transform;
pub mod types;

pub use batch::{BatchQueue, ProvisioningBatch};
pub use config::{ConfigError, ProvisioningConfig};
pub use dispatcher::{DispatchOutcome, ProvisioningDispatcher};
pub use error::{ProvisioningError, ProvisioningResult};
pub use executor::{ExecutorConfig, ProvisioningExecutor};
pub use ids::{BatchId, OperationId, SystemId};
pub use operation::{OperationResult, ProvisioningOperation, TargetKey};
pub use processor::{
    CreateProcessor, DeleteProcessor, ProcessOutcome, ProvisioningProcessor, UpdateProcessor,
};
pub use retry::RetryPolicy;
pub use system::{BlockedOperation, SuspendReason, SystemSnapshot};
pub use transform::{AttributeMapping, MappedObject, MappingEngine, ScriptLimits};
pub use types::{OperationState, ProvisioningOperationType};
