//! idm-provisioner - runs a provisioning request file through the dispatcher
//!
//! Reads systems and operations from a JSON file, dispatches them through the
//! executor against the connectors registered at startup and prints the
//! resulting operations as JSON on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use idm_ic::local::LocalConnectorService;
use idm_ic::memory::{MemoryConnectorFactory, MemoryStore};
use idm_ic::native::NativeConnectorInfo;
use idm_ic::{ConnectorAggregator, ConnectorFacade, ConnectorService};
use idm_provisioning::{
    MappingEngine, OperationState, ProvisioningConfig, ProvisioningDispatcher,
    ProvisioningExecutor,
};

mod logging;
mod request;

use logging::LogFormat;
use request::ProvisioningRequest;

/// Dispatch provisioning operations to target systems
#[derive(Parser, Debug)]
#[command(name = "idm-provisioner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with systems and operations
    #[arg(long, env = "IDM_PROVISIONING_REQUEST")]
    request: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info,idm_ic=info,idm_provisioning=debug")]
    log_filter: String,
}

/// Connector frameworks available to this process.
fn connector_services() -> Result<Vec<Arc<dyn ConnectorService>>, idm_ic::error::IcError> {
    let memory = Arc::new(MemoryConnectorFactory::new(MemoryStore::new()));
    let local = LocalConnectorService::new().with_bundle(
        NativeConnectorInfo::new("memory", "1.0", "MemoryConnector", memory)
            .with_display_name("In-memory connector"),
    )?;
    Ok(vec![Arc::new(local) as Arc<dyn ConnectorService>])
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_logging(&args.log_filter, args.log_format);

    let config = ProvisioningConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        concurrency = config.concurrency,
        max_attempts = config.max_attempts,
        "Starting idm-provisioner"
    );

    let aggregator = match connector_services().and_then(ConnectorAggregator::from_services) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to register connector services");
            std::process::exit(1);
        }
    };
    info!(frameworks = ?aggregator.frameworks(), "Connector services registered");

    let facade = ConnectorFacade::new(Arc::new(aggregator));
    let dispatcher = ProvisioningDispatcher::with_default_processors(facade);
    let executor = ProvisioningExecutor::new(Arc::new(dispatcher), config.executor_config());
    let engine = MappingEngine::with_limits(config.script_limits());

    let operations = match ProvisioningRequest::load(&args.request)
        .and_then(|request| request.resolve(&engine))
    {
        Ok(ops) => ops,
        Err(e) => {
            error!(path = %args.request.display(), error = %e, "Invalid provisioning request");
            std::process::exit(1);
        }
    };

    let results = executor.execute_all(operations).await;
    let operations: Vec<_> = results.into_iter().map(|(op, _)| op).collect();

    let failed = operations
        .iter()
        .filter(|op| op.state == OperationState::Exception)
        .count();
    info!(
        total = operations.len(),
        executed = operations
            .iter()
            .filter(|op| op.state == OperationState::Executed)
            .count(),
        failed,
        "Provisioning request finished"
    );

    match serde_json::to_string_pretty(&operations) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "Failed to serialize results");
            std::process::exit(1);
        }
    }

    if failed > 0 {
        std::process::exit(2);
    }
}
