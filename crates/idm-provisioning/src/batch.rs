//! Provisioning batches
//!
//! Operations on the same target must run in the order they were created.
//! A [`ProvisioningBatch`] keeps them in FIFO order; only the front operation
//! is ever handed out, and nothing else leaves the batch until it is settled.
//! When the front fails, the whole batch waits until its `next_attempt`.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, OperationId};
use crate::operation::{ProvisioningOperation, TargetKey};
use crate::types::OperationState;

/// FIFO of operations for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningBatch {
    pub id: BatchId,
    pub target: TargetKey,
    operations: VecDeque<ProvisioningOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt: Option<DateTime<Utc>>,
    /// Operation taken out and not yet settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    in_flight: Option<OperationId>,
}

impl ProvisioningBatch {
    pub fn new(target: TargetKey) -> Self {
        Self {
            id: BatchId::new(),
            target,
            operations: VecDeque::new(),
            next_attempt: None,
            in_flight: None,
        }
    }

    /// Append an operation. Operations for another target are handed back.
    pub fn push(&mut self, operation: ProvisioningOperation) -> Result<(), ProvisioningOperation> {
        if operation.target() != self.target {
            return Err(operation);
        }
        self.operations.push_back(operation);
        Ok(())
    }

    /// The operation to run next.
    pub fn front(&self) -> Option<&ProvisioningOperation> {
        self.operations.front()
    }

    /// Take the front operation out for execution.
    ///
    /// Returns `None` while an earlier operation is still in flight.
    pub fn take_front(&mut self) -> Option<ProvisioningOperation> {
        if self.in_flight.is_some() {
            return None;
        }
        let operation = self.operations.pop_front()?;
        self.in_flight = Some(operation.id);
        Some(operation)
    }

    /// The operation currently handed out, if any.
    pub fn in_flight(&self) -> Option<OperationId> {
        self.in_flight
    }

    /// Put an operation back at the front after a failed attempt and plan the batch.
    pub fn requeue_front(&mut self, operation: ProvisioningOperation) {
        self.release(operation.id);
        self.next_attempt = operation.next_attempt;
        self.operations.push_front(operation);
    }

    /// Clear the in-flight marker if it belongs to `id`.
    fn release(&mut self, id: OperationId) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
    }

    /// Drop the front operation if it has finished executing.
    pub fn pop_executed(&mut self) -> Option<ProvisioningOperation> {
        match self.operations.front() {
            Some(op) if op.state == OperationState::Executed => {
                self.next_attempt = None;
                self.operations.pop_front()
            }
            _ => None,
        }
    }

    /// True when the batch has work, nothing in flight and is not waiting.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.in_flight.is_none()
            && !self.operations.is_empty()
            && self.next_attempt.map_or(true, |at| at <= now)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Batches keyed by target.
#[derive(Debug, Default)]
pub struct BatchQueue {
    batches: HashMap<TargetKey, ProvisioningBatch>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to its target's batch, creating the batch if needed.
    pub fn enqueue(&mut self, operation: ProvisioningOperation) -> BatchId {
        let target = operation.target();
        let batch = self
            .batches
            .entry(target.clone())
            .or_insert_with(|| ProvisioningBatch::new(target));
        batch.operations.push_back(operation);
        batch.id
    }

    pub fn batch(&self, target: &TargetKey) -> Option<&ProvisioningBatch> {
        self.batches.get(target)
    }

    pub fn batch_mut(&mut self, target: &TargetKey) -> Option<&mut ProvisioningBatch> {
        self.batches.get_mut(target)
    }

    /// Take the front operation of every ready batch.
    ///
    /// At most one operation per target is in flight; a target is skipped
    /// until its previous operation is settled. Results are in target order.
    pub fn take_ready(&mut self, now: DateTime<Utc>) -> Vec<ProvisioningOperation> {
        let mut targets: Vec<TargetKey> = self
            .batches
            .iter()
            .filter(|(_, b)| b.is_ready(now))
            .map(|(t, _)| t.clone())
            .collect();
        targets.sort();

        targets
            .iter()
            .filter_map(|t| self.batches.get_mut(t).and_then(ProvisioningBatch::take_front))
            .collect()
    }

    /// Batches with work to hand out now, sorted by target.
    pub fn ready_batches(&self, now: DateTime<Utc>) -> Vec<&ProvisioningBatch> {
        let mut ready: Vec<_> = self.batches.values().filter(|b| b.is_ready(now)).collect();
        ready.sort_by(|a, b| a.target.cmp(&b.target));
        ready
    }

    /// Return an operation after dispatch.
    ///
    /// A failure with a planned `next_attempt` goes back to the front of its
    /// batch and blocks later operations on the target. Everything else leaves
    /// the queue and is handed back.
    pub fn settle(&mut self, operation: ProvisioningOperation) -> Option<ProvisioningOperation> {
        let target = operation.target();
        if operation.state == OperationState::Exception && operation.next_attempt.is_some() {
            let batch = self
                .batches
                .entry(target.clone())
                .or_insert_with(|| ProvisioningBatch::new(target));
            batch.requeue_front(operation);
            return None;
        }

        if let Some(batch) = self.batches.get_mut(&target) {
            batch.release(operation.id);
            if batch.is_empty() && batch.in_flight.is_none() {
                self.batches.remove(&target);
            }
        }
        Some(operation)
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.batches.values().map(ProvisioningBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
