// Copyright 2025 Cowboy AI, LLC.

//! The uniform resolver capability and the environment resolvers run in
//!
//! Timer, callback chain and aggregator each own only their auxiliary records.
//! Promise state, the domain clock and the call targets live in the
//! [`Ledger`], which is handed to every operation explicitly.

use crate::callback::TargetDirectory;
use crate::clock::{Clock, Timestamp};
use crate::errors::PromiseResult;
use crate::identifiers::{DomainId, PromiseId};
use crate::promise::PromiseStatus;
use crate::registry::PromiseRegistry;
use crate::relay::Component;
use std::sync::Arc;

/// Shared state of one domain
#[derive(Debug)]
pub struct Ledger {
    pub(crate) registry: PromiseRegistry,
    pub(crate) targets: TargetDirectory,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Create an empty ledger for `domain` reading `clock`
    pub fn new(domain: DomainId, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: PromiseRegistry::new(domain),
            targets: TargetDirectory::new(),
            clock,
        }
    }

    /// Domain this ledger belongs to
    pub fn domain(&self) -> DomainId {
        self.registry.domain()
    }

    /// Current time on this domain's clock
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Promise registry
    pub fn registry(&self) -> &PromiseRegistry {
        &self.registry
    }

    /// Promise registry, mutably
    pub fn registry_mut(&mut self) -> &mut PromiseRegistry {
        &mut self.registry
    }

    /// Call targets callbacks may invoke
    pub fn targets(&self) -> &TargetDirectory {
        &self.targets
    }

    /// Call targets, mutably
    pub fn targets_mut(&mut self) -> &mut TargetDirectory {
        &mut self.targets
    }

    /// Shorthand for `registry().status(id)`
    pub fn status(&self, id: &PromiseId) -> PromiseStatus {
        self.registry.status(id)
    }
}

/// A component that settles promises once their preconditions hold
///
/// `can_resolve` is a pure query, safe to call any number of times in any
/// order. `resolve` re-validates everything itself; a caller that skipped the
/// check gets a precondition error back, never a partial state change.
pub trait Resolver {
    /// Which component this is
    fn component(&self) -> Component;

    /// Ids of the records this component still has to settle
    fn pending_ids(&self) -> Vec<PromiseId>;

    /// Whether `resolve(id)` would succeed right now
    fn can_resolve(&self, ledger: &Ledger, id: &PromiseId) -> bool;

    /// Settle `id` and delete its auxiliary record
    ///
    /// Returns the status the promise settled with.
    fn resolve(&mut self, ledger: &mut Ledger, id: &PromiseId) -> PromiseResult<PromiseStatus>;
}
