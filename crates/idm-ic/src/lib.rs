//! # Identity Connector layer
//!
//! Vendor-neutral connector abstraction used by the provisioning core.
//!
//! Callers talk to a [`ConnectorFacade`]. The facade checks the supplied
//! configuration, asks the [`ConnectorAggregator`] for the
//! [`ConnectorService`] registered under the key's framework and delegates.
//! A service translates between the neutral model and whatever its connectors
//! speak; the bundled [`LocalConnectorService`] hosts native bundles
//! in-process.
//!
//! ## Example
//!
//! ```ignore
//! use idm_ic::prelude::*;
//!
//! let store = MemoryStore::new();
//! let local = LocalConnectorService::new().with_bundle(NativeConnectorInfo::new(
//!     "memory",
//!     "1.0",
//!     "MemoryConnector",
//!     Arc::new(MemoryConnectorFactory::new(store)),
//! ))?;
//!
//! let aggregator = ConnectorAggregator::from_services([Arc::new(local) as _])?;
//! let facade = ConnectorFacade::new(Arc::new(aggregator));
//!
//! let key: ConnectorKey = "local:memory:1.0:MemoryConnector".parse()?;
//! let uid = facade
//!     .create_object(&key, Some(&config), &ObjectClass::account(), &attributes)
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`key`] - Connector keys
//! - [`configuration`] - Connector configuration properties
//! - [`object`] - Object classes, attributes, UIDs and filters
//! - [`native`] - The native connector SPI
//! - [`convert`] - Neutral/native conversion
//! - [`service`] - Per-framework service contract
//! - [`aggregator`] - Service registry
//! - [`facade`] - Caller entry point
//! - [`local`] - In-process framework service
//! - [`memory`] - In-memory connector bundle

pub mod aggregator;
pub mod configuration;
pub mod convert;
pub mod error;
pub mod facade;
pub mod key;
pub mod local;
pub mod memory;
pub mod native;
pub mod object;
pub mod service;

/// Prelude module for convenient imports.
///
/// ```
/// use idm_ic::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregator::ConnectorAggregator;
    pub use crate::configuration::{ConfigurationProperty, ConnectorConfiguration};
    pub use crate::error::{IcError, IcOperation, IcResult};
    pub use crate::facade::ConnectorFacade;
    pub use crate::key::ConnectorKey;
    pub use crate::local::{LocalConnectorService, LOCAL_FRAMEWORK};
    pub use crate::memory::{MemoryConnectorFactory, MemoryStore};
    pub use crate::native::{
        NativeAttribute, NativeConfigurationProperty, NativeConnector, NativeConnectorFactory,
        NativeConnectorInfo, NativeConnectorObject, NativeError, NativeResult, NativeUid,
    };
    pub use crate::object::{
        Attribute, AttributeValue, ConnectorObject, Filter, ObjectClass, UidAttribute, NAME_NAME,
        UID_NAME,
    };
    pub use crate::service::{ConnectorInfo, ConnectorService};
}

pub use aggregator::ConnectorAggregator;
pub use facade::ConnectorFacade;
pub use local::LocalConnectorService;
pub use service::ConnectorService;

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
