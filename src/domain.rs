// Copyright 2025 Cowboy AI, LLC.

//! One execution domain
//!
//! A [`Domain`] is everything a single chain runs: the ledger (registry,
//! clock, call targets), the three resolver components, an outbox for relayed
//! messages and a resolution driver. Calls are synchronous and applied one at
//! a time; each either succeeds completely or fails without a state change.
//!
//! Operations that a principal performs take the caller's [`Address`]
//! explicitly, the way a ledger attributes every call to a sender.

use crate::aggregator::{AggregateStatus, Aggregator};
use crate::callback::{CallTarget, CallbackChain, CallbackRecord};
use crate::clock::{Clock, Timestamp};
use crate::config::{DomainConfig, DriverConfig};
use crate::driver::{DriveReport, LayerReport, ResolutionDriver};
use crate::errors::{PromiseError, PromiseResult};
use crate::events::PromiseEvent;
use crate::identifiers::{Address, DomainId, MessageHandle, PromiseId};
use crate::promise::{Promise, PromiseStatus};
use crate::relay::{Component, Envelope, Outbox, RelayContext, RelayMessage, Transport};
use crate::resolver::{Ledger, Resolver};
use crate::timer::DeferredTimer;
use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

/// A single domain with its promise components
#[derive(Debug)]
pub struct Domain {
    config: DomainConfig,
    ledger: Ledger,
    timer: DeferredTimer,
    callbacks: CallbackChain,
    aggregator: Aggregator,
    outbox: Outbox,
    driver: ResolutionDriver,
}

impl Domain {
    /// Create a domain reading `clock`
    pub fn new(config: DomainConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Ledger::new(config.domain_id, clock),
            outbox: Outbox::new(config.domain_id),
            config,
            timer: DeferredTimer::new(),
            callbacks: CallbackChain::new(),
            aggregator: Aggregator::new(),
            driver: ResolutionDriver::default(),
        }
    }

    /// Use a driver with different bounds
    pub fn with_driver(mut self, config: DriverConfig) -> Self {
        self.driver = ResolutionDriver::new(config);
        self
    }

    /// This domain's id
    pub fn id(&self) -> DomainId {
        self.config.domain_id
    }

    /// This domain's configuration
    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Current time on this domain's clock
    pub fn now(&self) -> Timestamp {
        self.ledger.now()
    }

    /// The shared ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Make `target` callable by callbacks at `address`
    pub fn register_target(&mut self, address: Address, target: impl CallTarget + 'static) {
        self.ledger.targets_mut().register(address, target);
    }

    // Promise registry

    /// Create a Pending promise owned by `caller`
    pub fn create_promise(&mut self, caller: Address) -> PromiseId {
        self.ledger.registry.create(caller)
    }

    /// Resolve `id` as its creator
    pub fn resolve_promise(&mut self, caller: Address, id: &PromiseId, payload: impl Into<Bytes>) -> PromiseResult<()> {
        self.ledger.registry.resolve(caller, id, payload.into())
    }

    /// Reject `id` as its creator
    pub fn reject_promise(&mut self, caller: Address, id: &PromiseId, payload: impl Into<Bytes>) -> PromiseResult<()> {
        self.ledger.registry.reject(caller, id, payload.into())
    }

    /// Status of `id` (Pending for never-seen ids)
    pub fn status(&self, id: &PromiseId) -> PromiseStatus {
        self.ledger.registry.status(id)
    }

    /// Whether `id` exists on this domain
    pub fn exists(&self, id: &PromiseId) -> bool {
        self.ledger.registry.exists(id)
    }

    /// Record of `id` (zero value for never-seen ids)
    pub fn get_promise(&self, id: &PromiseId) -> Promise {
        self.ledger.registry.get_promise(id)
    }

    /// Send a snapshot of settled `id` to `destination`
    pub fn share_settled(&mut self, destination: DomainId, id: &PromiseId) -> PromiseResult<MessageHandle> {
        let message = self.ledger.registry.share_settled(id, destination)?;
        Ok(self.outbox.send(Component::Registry, destination, message))
    }

    /// Move resolution rights for Pending `id` to `new_resolver` on `destination`
    pub fn transfer_resolve(
        &mut self,
        caller: Address,
        id: &PromiseId,
        destination: DomainId,
        new_resolver: Address,
    ) -> PromiseResult<MessageHandle> {
        let message = self
            .ledger
            .registry
            .transfer_resolve(caller, id, destination, new_resolver)?;
        Ok(self.outbox.send(Component::Registry, destination, message))
    }

    // Deferred timer

    /// Create a promise that becomes resolvable at `deadline`
    pub fn set_timeout(&mut self, deadline: Timestamp) -> PromiseResult<PromiseId> {
        self.timer.create(&mut self.ledger, deadline)
    }

    /// Settle timer `id` once its deadline has passed (anyone may call)
    pub fn resolve_timeout(&mut self, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        self.timer.resolve(&mut self.ledger, id)
    }

    /// Whether timer `id` is due
    pub fn can_resolve_timeout(&self, id: &PromiseId) -> bool {
        self.timer.can_resolve(&self.ledger, id)
    }

    /// Deadline of timer `id`, `None` once settled
    pub fn get_timeout(&self, id: &PromiseId) -> Option<Timestamp> {
        self.timer.get_timeout(id)
    }

    /// Seconds until timer `id` is due
    pub fn get_remaining_time(&self, id: &PromiseId) -> u64 {
        self.timer.get_remaining_time(&self.ledger, id)
    }

    // Callback chain

    /// Register a Then callback on `parent` (which need not exist yet)
    pub fn then(&mut self, parent: PromiseId, target: Address, entry: impl Into<String>) -> PromiseId {
        self.callbacks.then(&mut self.ledger, parent, target, entry)
    }

    /// Register a Catch callback on `parent` (which need not exist yet)
    pub fn on_reject(&mut self, parent: PromiseId, target: Address, entry: impl Into<String>) -> PromiseId {
        self.callbacks.on_reject(&mut self.ledger, parent, target, entry)
    }

    /// Register a Then callback that executes on `destination`
    pub fn then_on(
        &mut self,
        destination: DomainId,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseResult<PromiseId> {
        self.callbacks
            .then_on(&mut self.ledger, &mut self.outbox, destination, parent, target, entry)
    }

    /// Register a Catch callback that executes on `destination`
    pub fn on_reject_on(
        &mut self,
        destination: DomainId,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseResult<PromiseId> {
        self.callbacks
            .on_reject_on(&mut self.ledger, &mut self.outbox, destination, parent, target, entry)
    }

    /// Execute callback `id`
    pub fn resolve_callback(&mut self, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        self.callbacks.resolve(&mut self.ledger, id)
    }

    /// Whether callback `id` can execute now
    pub fn can_resolve_callback(&self, id: &PromiseId) -> bool {
        self.callbacks.can_resolve(&self.ledger, id)
    }

    /// Record of callback `id` while it waits
    pub fn get_callback(&self, id: &PromiseId) -> Option<&CallbackRecord> {
        self.callbacks.get_callback(id)
    }

    /// Whether callback `id` is registered here and has not executed
    pub fn callback_exists(&self, id: &PromiseId) -> bool {
        self.callbacks.exists(id)
    }

    // Aggregator

    /// Aggregate over `inputs` (wait-for-all, fail-fast)
    pub fn promise_all(&mut self, inputs: Vec<PromiseId>) -> PromiseResult<PromiseId> {
        self.aggregator.create(&mut self.ledger, inputs)
    }

    /// Settle aggregate `id`
    pub fn resolve_aggregate(&mut self, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        self.aggregator.resolve(&mut self.ledger, id)
    }

    /// Whether aggregate `id` can settle now
    pub fn can_resolve_aggregate(&self, id: &PromiseId) -> bool {
        self.aggregator.can_resolve(&self.ledger, id)
    }

    /// Inputs of aggregate `id` while it waits
    pub fn get_input_promises(&self, id: &PromiseId) -> Option<&[PromiseId]> {
        self.aggregator.get_input_promises(id)
    }

    /// Progress of aggregate `id`
    pub fn get_aggregate_status(&self, id: &PromiseId) -> AggregateStatus {
        self.aggregator.get_status(&self.ledger, id)
    }

    /// Whether aggregate `id` still has a record here
    pub fn aggregate_exists(&self, id: &PromiseId) -> bool {
        self.aggregator.get_input_promises(id).is_some()
    }

    // Relay boundary

    /// Handle a relayed message delivered under `ctx`
    ///
    /// Deliveries are refused unless the transport is the immediate caller and
    /// attributes the message to the target component's counterpart on another
    /// domain. Every handler is safe to replay.
    pub fn receive(&mut self, ctx: &RelayContext, envelope: Envelope) -> PromiseResult<()> {
        let result = self.dispatch(ctx, envelope);
        if let Err(err) = &result {
            warn!(domain = %self.id(), error = %err, "Relayed message refused");
        }
        result
    }

    fn dispatch(&mut self, ctx: &RelayContext, envelope: Envelope) -> PromiseResult<()> {
        let component = envelope.message.target_component();
        if envelope.target != component {
            return Err(PromiseError::UnauthorizedRelay {
                component: envelope.target,
                reason: format!("message is handled by the {component}"),
            });
        }
        if envelope.destination != self.id() {
            return Err(PromiseError::UnauthorizedRelay {
                component,
                reason: format!("addressed to {}", envelope.destination),
            });
        }
        ctx.authenticate(component, self.id(), self.config.transport)?;

        match envelope.message {
            RelayMessage::ShareSettled {
                id,
                status,
                payload,
                creator,
            } => self
                .ledger
                .registry
                .receive_shared(&id, status, payload, creator),
            RelayMessage::TransferResolver {
                id,
                new_resolver,
                generation,
            } => {
                self.ledger
                    .registry
                    .receive_resolver_transfer(&id, new_resolver, generation);
                Ok(())
            }
            RelayMessage::RegisterCallback {
                id,
                parent,
                target,
                entry,
                kind,
            } => {
                self.callbacks.receive_callback_registration(
                    &mut self.ledger,
                    id,
                    CallbackRecord {
                        parent,
                        target,
                        entry,
                        kind,
                    },
                );
                Ok(())
            }
        }
    }

    /// Messages waiting to be carried to other domains
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Take every waiting message in send order
    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.outbox.drain()
    }

    // Resolution driver

    /// Run one collect-then-resolve layer over timer, callbacks and aggregator
    pub fn run_layer(&mut self) -> LayerReport {
        let mut resolvers: [&mut dyn Resolver; 3] =
            [&mut self.timer, &mut self.callbacks, &mut self.aggregator];
        self.driver.run_layer(&mut self.ledger, &mut resolvers)
    }

    /// Run layers until nothing more can settle
    pub fn resolve_all(&mut self) -> DriveReport {
        let mut resolvers: [&mut dyn Resolver; 3] =
            [&mut self.timer, &mut self.callbacks, &mut self.aggregator];
        self.driver.resolve_all(&mut self.ledger, &mut resolvers)
    }

    // Events

    /// Events recorded so far
    pub fn events(&self) -> &[PromiseEvent] {
        self.ledger.registry.events()
    }

    /// Take all recorded events
    pub fn drain_events(&mut self) -> Vec<PromiseEvent> {
        self.ledger.registry.drain_events()
    }
}
