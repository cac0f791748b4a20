// Copyright 2025 Cowboy AI, LLC.

//! Deferred timer
//!
//! Produces promises that settle once the domain clock reaches a deadline.
//! Settling is permissionless: whether the deadline has passed is a publicly
//! checkable fact, so anyone may call [`DeferredTimer::resolve`].

use crate::clock::Timestamp;
use crate::errors::{PromiseError, PromiseResult};
use crate::events::PromiseEvent;
use crate::identifiers::PromiseId;
use crate::promise::PromiseStatus;
use crate::relay::Component;
use crate::resolver::{Ledger, Resolver};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, info};

/// Timeout records keyed by timer promise id
#[derive(Debug, Clone, Default)]
pub struct DeferredTimer {
    deadlines: HashMap<PromiseId, Timestamp>,
}

impl DeferredTimer {
    /// Create a timer component with no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a promise that becomes resolvable at `deadline`
    pub fn create(&mut self, ledger: &mut Ledger, deadline: Timestamp) -> PromiseResult<PromiseId> {
        let now = ledger.now();
        if deadline <= now {
            return Err(PromiseError::DeadlineNotFuture { deadline, now });
        }

        let id = ledger.registry.create(Component::Timer.address());
        self.deadlines.insert(id, deadline);

        debug!(promise_id = %id, deadline, now, "Timeout created");
        ledger.registry.emit(PromiseEvent::TimeoutCreated { id, deadline });
        Ok(id)
    }

    /// Deadline of `id`, `None` once settled or if never created here
    pub fn get_timeout(&self, id: &PromiseId) -> Option<Timestamp> {
        self.deadlines.get(id).copied()
    }

    /// Seconds until `id` becomes resolvable; zero if due or unknown
    pub fn get_remaining_time(&self, ledger: &Ledger, id: &PromiseId) -> u64 {
        self.get_timeout(id)
            .map(|deadline| deadline.saturating_sub(ledger.now()))
            .unwrap_or(0)
    }

    /// Timer promises still waiting, with their deadlines
    pub fn pending_timeouts(&self) -> impl Iterator<Item = (&PromiseId, &Timestamp)> {
        self.deadlines.iter()
    }
}

impl Resolver for DeferredTimer {
    fn component(&self) -> Component {
        Component::Timer
    }

    fn pending_ids(&self) -> Vec<PromiseId> {
        self.deadlines.keys().copied().collect()
    }

    fn can_resolve(&self, ledger: &Ledger, id: &PromiseId) -> bool {
        match self.deadlines.get(id) {
            Some(deadline) => {
                ledger.status(id) == PromiseStatus::Pending && ledger.now() >= *deadline
            }
            None => false,
        }
    }

    fn resolve(&mut self, ledger: &mut Ledger, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        let deadline = *self.deadlines.get(id).ok_or(PromiseError::NotFound {
            component: Component::Timer,
            id: *id,
        })?;
        let now = ledger.now();
        if now < deadline {
            return Err(PromiseError::TooEarly {
                id: *id,
                deadline,
                now,
            });
        }
        let status = ledger.status(id);
        if status.is_settled() {
            return Err(PromiseError::AlreadySettled { id: *id, status });
        }

        ledger
            .registry
            .resolve(Component::Timer.address(), id, Bytes::new())?;
        self.deadlines.remove(id);

        info!(promise_id = %id, deadline, now, "Timeout resolved");
        Ok(PromiseStatus::Resolved)
    }
}
