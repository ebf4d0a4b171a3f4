//! Concurrent operation executor
//!
//! Wraps the dispatcher with the two guarantees callers need when many
//! operations are in flight: at most one dispatch per [`TargetKey`] at a time,
//! and a global cap on concurrent dispatches. After a transient failure the
//! executor plans the next attempt; it never retries by itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::dispatcher::{DispatchOutcome, ProvisioningDispatcher};
use crate::error::ProvisioningError;
use crate::operation::{OperationResult, ProvisioningOperation, TargetKey};
use crate::retry::RetryPolicy;
use crate::system::SystemSnapshot;

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum dispatches in flight across all targets.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            retry: RetryPolicy::default(),
        }
    }
}

type TargetLocks = HashMap<TargetKey, Arc<tokio::sync::Mutex<()>>>;

/// Runs operations through a dispatcher with per-target serialisation.
///
/// Cloning is cheap; clones share the semaphore and the target locks.
#[derive(Clone)]
pub struct ProvisioningExecutor {
    dispatcher: Arc<ProvisioningDispatcher>,
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
    targets: Arc<Mutex<TargetLocks>>,
}

impl ProvisioningExecutor {
    pub fn new(dispatcher: Arc<ProvisioningDispatcher>, config: ExecutorConfig) -> Self {
        let permits = config.concurrency.max(1);
        Self {
            dispatcher,
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
            targets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Number of targets with a dispatch running or waiting.
    #[must_use]
    pub fn active_targets(&self) -> usize {
        self.lock_targets().len()
    }

    /// Dispatch one operation and hand it back with its outcome.
    ///
    /// Waits for any other dispatch on the same target before taking a
    /// concurrency permit.
    #[instrument(skip_all, fields(operation_id = %operation.id, target_key = %operation.target()))]
    pub async fn execute(
        &self,
        mut operation: ProvisioningOperation,
        system: Arc<SystemSnapshot>,
    ) -> (ProvisioningOperation, DispatchOutcome) {
        let target = operation.target();
        let lock = self.target_lock(&target);

        let outcome = {
            let _guard = lock.lock().await;
            match self.semaphore.acquire().await {
                Ok(_permit) => {
                    let outcome = self.dispatcher.dispatch(&mut operation, &system).await;
                    self.plan_next_attempt(&mut operation, &outcome);
                    outcome
                }
                Err(e) => {
                    let error = ProvisioningError::internal_with_source("executor is closed", e);
                    operation.complete(OperationResult::exception(&error, Duration::ZERO));
                    DispatchOutcome::Failed(error)
                }
            }
        };

        drop(lock);
        self.release_target(&target);
        (operation, outcome)
    }

    /// Dispatch many operations concurrently.
    ///
    /// Operations on the same target run one after another in input order;
    /// different targets run in parallel up to the concurrency limit. Results
    /// come back in input order.
    pub async fn execute_all(
        &self,
        operations: Vec<(ProvisioningOperation, Arc<SystemSnapshot>)>,
    ) -> Vec<(ProvisioningOperation, DispatchOutcome)> {
        let total = operations.len();
        info!(operations = total, "Executing provisioning operations");

        let mut groups: Vec<Vec<(usize, ProvisioningOperation, Arc<SystemSnapshot>)>> = Vec::new();
        let mut group_of: HashMap<TargetKey, usize> = HashMap::new();
        for (index, (operation, system)) in operations.into_iter().enumerate() {
            let slot = *group_of.entry(operation.target()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push((index, operation, system));
        }

        let mut handles = Vec::with_capacity(groups.len());
        for group in groups {
            let pending: Vec<(usize, ProvisioningOperation)> =
                group.iter().map(|(i, op, _)| (*i, op.clone())).collect();
            let executor = self.clone();
            let handle = tokio::spawn(async move {
                let mut results = Vec::with_capacity(group.len());
                for (index, operation, system) in group {
                    results.push((index, executor.execute(operation, system).await));
                }
                results
            });
            handles.push((pending, handle));
        }

        let mut slots: Vec<Option<(ProvisioningOperation, DispatchOutcome)>> =
            (0..total).map(|_| None).collect();
        for (pending, handle) in handles {
            match handle.await {
                Ok(results) => {
                    for (index, result) in results {
                        slots[index] = Some(result);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Provisioning task aborted");
                    let message = e.to_string();
                    for (index, mut operation) in pending {
                        if slots[index].is_some() {
                            continue;
                        }
                        let error = ProvisioningError::internal(format!(
                            "provisioning task aborted: {message}"
                        ));
                        operation.complete(OperationResult::exception(&error, Duration::ZERO));
                        slots[index] = Some((operation, DispatchOutcome::Failed(error)));
                    }
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    fn plan_next_attempt(&self, operation: &mut ProvisioningOperation, outcome: &DispatchOutcome) {
        operation.next_attempt = match outcome {
            DispatchOutcome::Failed(error) if error.is_transient() => {
                let next = self.config.retry.next_attempt(operation.attempts, Utc::now());
                match next {
                    Some(at) => debug!(attempt = operation.attempts, next_attempt = %at, "Retry planned"),
                    None => warn!(attempt = operation.attempts, "Retry attempts exhausted"),
                }
                next
            }
            _ => None,
        };
    }

    fn lock_targets(&self) -> MutexGuard<'_, TargetLocks> {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn target_lock(&self, target: &TargetKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.lock_targets().entry(target.clone()).or_default())
    }

    fn release_target(&self, target: &TargetKey) {
        let mut targets = self.lock_targets();
        if targets
            .get(target)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            targets.remove(target);
        }
    }
}

impl std::fmt::Debug for ProvisioningExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningExecutor")
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}
