// Copyright 2025 Cowboy AI, LLC.

//! Wait-for-all aggregation
//!
//! An aggregate promise resolves with the payloads of all its inputs, in input
//! order, once every input has resolved. It rejects with the payload of the
//! lowest-index rejected input as soon as any input rejects (fail-fast).
//!
//! No per-input progress is cached: every check recomputes the condition from
//! the registry, so the order in which inputs settle never matters. Inputs
//! that do not exist locally read as Pending and hold the aggregate back until
//! they are shared in.

use crate::codec;
use crate::errors::{PromiseError, PromiseResult};
use crate::events::PromiseEvent;
use crate::identifiers::PromiseId;
use crate::promise::PromiseStatus;
use crate::relay::Component;
use crate::resolver::{Ledger, Resolver};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Progress snapshot of an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStatus {
    /// Inputs currently resolved
    pub resolved: usize,
    /// Number of inputs
    pub total: usize,
    /// Whether the aggregate promise itself has settled
    pub settled: bool,
}

/// What the inputs currently add up to
enum Outcome {
    /// First rejected input, by position
    Rejected(PromiseId),
    AllResolved,
    Waiting { resolved: usize },
}

/// Aggregate records keyed by aggregate promise id
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    inputs: HashMap<PromiseId, Vec<PromiseId>>,
}

impl Aggregator {
    /// Create an aggregator with no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate over `inputs`, kept verbatim and in order
    pub fn create(&mut self, ledger: &mut Ledger, inputs: Vec<PromiseId>) -> PromiseResult<PromiseId> {
        if inputs.is_empty() {
            return Err(PromiseError::EmptyInput);
        }

        let id = ledger.registry.create(Component::Aggregator.address());
        debug!(promise_id = %id, inputs = inputs.len(), "Aggregate created");

        ledger.registry.emit(PromiseEvent::AggregateCreated {
            id,
            inputs: inputs.clone(),
        });
        self.inputs.insert(id, inputs);
        Ok(id)
    }

    /// Inputs of aggregate `id`, `None` once settled or if never created here
    pub fn get_input_promises(&self, id: &PromiseId) -> Option<&[PromiseId]> {
        self.inputs.get(id).map(Vec::as_slice)
    }

    /// Progress of aggregate `id`
    ///
    /// Once the aggregate has settled its record is gone and the counts read
    /// as zero.
    pub fn get_status(&self, ledger: &Ledger, id: &PromiseId) -> AggregateStatus {
        let settled = ledger.status(id).is_settled();
        match self.inputs.get(id) {
            Some(inputs) => AggregateStatus {
                resolved: inputs
                    .iter()
                    .filter(|input| ledger.status(input) == PromiseStatus::Resolved)
                    .count(),
                total: inputs.len(),
                settled,
            },
            None => AggregateStatus {
                resolved: 0,
                total: 0,
                settled,
            },
        }
    }

    fn evaluate(ledger: &Ledger, inputs: &[PromiseId]) -> Outcome {
        let mut resolved = 0;
        for input in inputs {
            match ledger.status(input) {
                PromiseStatus::Rejected => return Outcome::Rejected(*input),
                PromiseStatus::Resolved => resolved += 1,
                PromiseStatus::Pending => {}
            }
        }
        if resolved == inputs.len() {
            Outcome::AllResolved
        } else {
            Outcome::Waiting { resolved }
        }
    }
}

impl Resolver for Aggregator {
    fn component(&self) -> Component {
        Component::Aggregator
    }

    fn pending_ids(&self) -> Vec<PromiseId> {
        self.inputs.keys().copied().collect()
    }

    fn can_resolve(&self, ledger: &Ledger, id: &PromiseId) -> bool {
        let Some(inputs) = self.inputs.get(id) else {
            return false;
        };
        if ledger.status(id).is_settled() {
            return false;
        }
        !matches!(Self::evaluate(ledger, inputs), Outcome::Waiting { .. })
    }

    fn resolve(&mut self, ledger: &mut Ledger, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        let inputs = self.inputs.get(id).ok_or(PromiseError::NotFound {
            component: Component::Aggregator,
            id: *id,
        })?;
        let status = ledger.status(id);
        if status.is_settled() {
            return Err(PromiseError::AlreadySettled { id: *id, status });
        }

        let aggregator = Component::Aggregator.address();
        let settled = match Self::evaluate(ledger, inputs) {
            Outcome::Waiting { resolved } => {
                return Err(PromiseError::NotAllResolved {
                    id: *id,
                    resolved,
                    total: inputs.len(),
                });
            }
            Outcome::Rejected(first) => {
                let reason = ledger.registry.payload(&first);
                ledger.registry.reject(aggregator, id, reason)?;
                info!(promise_id = %id, rejected_input = %first, "Aggregate failed fast");
                PromiseStatus::Rejected
            }
            Outcome::AllResolved => {
                let values: Vec<_> = inputs
                    .iter()
                    .map(|input| ledger.registry.payload(input))
                    .collect();
                let payload = codec::encode_sequence(&values)?;
                ledger.registry.resolve(aggregator, id, payload)?;
                info!(promise_id = %id, inputs = values.len(), "Aggregate resolved");
                PromiseStatus::Resolved
            }
        };

        self.inputs.remove(id);
        ledger
            .registry
            .emit(PromiseEvent::AggregateSettled { id: *id, status: settled });
        Ok(settled)
    }
}
