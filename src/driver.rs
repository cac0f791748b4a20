// Copyright 2025 Cowboy AI, LLC.

//! Layered resolution driver
//!
//! One layer is two passes over the records the resolvers still hold, oldest
//! promise first and at most `scan_limit` of them:
//! 1. collect every (resolver, id) pair whose `can_resolve` holds,
//! 2. resolve every collected pair, swallowing individual failures.
//!
//! Nothing resolved in pass 2 can make another pair eligible within the same
//! layer, so a dependency chain of depth `n` (timer -> callback -> aggregate
//! -> ...) settles in exactly `n` layers.

use crate::config::DriverConfig;
use crate::errors::PromiseError;
use crate::identifiers::PromiseId;
use crate::promise::PromiseStatus;
use crate::relay::Component;
use crate::resolver::{Ledger, Resolver};
use tracing::{debug, info, warn};

/// Outcome of one layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerReport {
    /// Promises settled, with the resolver that settled them
    pub resolved: Vec<(Component, PromiseId, PromiseStatus)>,
    /// Collected pairs whose resolve call failed anyway
    pub failed: Vec<(Component, PromiseId, PromiseError)>,
}

impl LayerReport {
    /// Number of promises settled in this layer
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

/// Outcome of running layers until quiescence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveReport {
    /// One report per layer that ran, including the final empty one
    pub layers: Vec<LayerReport>,
    /// Whether the layer cap stopped the run before quiescence
    pub hit_layer_cap: bool,
}

impl DriveReport {
    /// Total promises settled across all layers
    pub fn resolved_count(&self) -> usize {
        self.layers.iter().map(LayerReport::resolved_count).sum()
    }

    /// Number of layers that settled at least one promise
    pub fn productive_layers(&self) -> usize {
        self.layers.iter().filter(|l| !l.resolved.is_empty()).count()
    }
}

/// Scheduler over a homogeneous set of resolvers
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionDriver {
    config: DriverConfig,
}

impl ResolutionDriver {
    /// Create a driver with the given bounds
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// The driver's bounds
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run one collect-then-resolve layer
    pub fn run_layer(&self, ledger: &mut Ledger, resolvers: &mut [&mut dyn Resolver]) -> LayerReport {
        let mut candidates: Vec<(usize, PromiseId)> = resolvers
            .iter()
            .enumerate()
            .flat_map(|(index, resolver)| {
                resolver
                    .pending_ids()
                    .into_iter()
                    .map(move |id| (index, id))
            })
            .collect();

        // Oldest first; records still waiting for their rights go last
        let registry = ledger.registry();
        candidates.sort_by_key(|(_, id)| registry.position(id).unwrap_or(usize::MAX));
        candidates.truncate(self.config.scan_limit);

        let worklist: Vec<(usize, PromiseId)> = candidates
            .iter()
            .filter(|(index, id)| resolvers[*index].can_resolve(ledger, id))
            .copied()
            .collect();
        debug!(
            domain = %ledger.domain(),
            scanned = candidates.len(),
            eligible = worklist.len(),
            "Layer collected"
        );

        let mut report = LayerReport::default();
        for (index, id) in worklist {
            let resolver = &mut resolvers[index];
            let component = resolver.component();
            match resolver.resolve(ledger, &id) {
                Ok(status) => report.resolved.push((component, id, status)),
                Err(err) => {
                    warn!(promise_id = %id, %component, error = %err, "Collected resolve failed");
                    report.failed.push((component, id, err));
                }
            }
        }
        report
    }

    /// Run layers until one settles nothing, or the layer cap is reached
    pub fn resolve_all(&self, ledger: &mut Ledger, resolvers: &mut [&mut dyn Resolver]) -> DriveReport {
        let mut drive = DriveReport::default();
        for _ in 0..self.config.max_layers {
            let layer = self.run_layer(ledger, resolvers);
            let done = layer.resolved.is_empty();
            drive.layers.push(layer);
            if done {
                info!(
                    domain = %ledger.domain(),
                    layers = drive.layers.len(),
                    resolved = drive.resolved_count(),
                    "Resolution quiescent"
                );
                return drive;
            }
        }

        warn!(
            domain = %ledger.domain(),
            max_layers = self.config.max_layers,
            resolved = drive.resolved_count(),
            "Layer cap reached before quiescence"
        );
        drive.hit_layer_cap = true;
        drive
    }
}
