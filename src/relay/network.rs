// Copyright 2025 Cowboy AI, LLC.

//! In-memory transport between domains
//!
//! The network owns a set of [`Domain`]s and carries their outboxes. Messages
//! travel as serialized bytes and are delivered under the network's own
//! transport principal, so receive handlers authenticate them exactly as they
//! would authenticate a real relay.
//!
//! Delivery order is under the caller's control: FIFO by default, or any
//! in-flight message by handle. Messages can be dropped, and delivered ones
//! replayed, to exercise the at-most-once and idempotence guarantees.

use crate::config::DEFAULT_TRANSPORT_LABEL;
use crate::domain::Domain;
use crate::errors::{PromiseError, PromiseResult};
use crate::identifiers::{Address, DomainId, MessageHandle};
use crate::relay::{Envelope, RelayContext};
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// A serialized envelope waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Handle the sender got back
    pub handle: MessageHandle,
    /// Domain it is addressed to
    pub destination: DomainId,
    /// Wire form of the envelope
    pub bytes: Bytes,
}

/// What happened to one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Delivered message
    pub handle: MessageHandle,
    /// Domain it was delivered to
    pub destination: DomainId,
    /// The receiving domain's answer
    pub outcome: PromiseResult<()>,
}

impl DeliveryReport {
    /// Whether the receiver accepted the message
    pub fn accepted(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Domains connected by an in-memory relay
#[derive(Debug)]
pub struct Network {
    transport: Address,
    domains: BTreeMap<DomainId, Domain>,
    in_flight: VecDeque<InFlight>,
    delivered: IndexMap<MessageHandle, InFlight>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network using the default transport principal
    pub fn new() -> Self {
        Self::with_transport(Address::derive(DEFAULT_TRANSPORT_LABEL))
    }

    /// Create an empty network delivering as `transport`
    pub fn with_transport(transport: Address) -> Self {
        Self {
            transport,
            domains: BTreeMap::new(),
            in_flight: VecDeque::new(),
            delivered: IndexMap::new(),
        }
    }

    /// Principal every delivery is made as
    pub fn transport(&self) -> Address {
        self.transport
    }

    /// Connect `domain`; ids must be unique
    pub fn add_domain(&mut self, domain: Domain) -> PromiseResult<()> {
        let id = domain.id();
        if self.domains.contains_key(&id) {
            return Err(PromiseError::Configuration(format!("{id} is already connected")));
        }
        if domain.config().transport != self.transport {
            warn!(domain = %id, "Domain trusts a different transport; deliveries will be refused");
        }
        self.domains.insert(id, domain);
        Ok(())
    }

    /// Connected domain ids in ascending order
    pub fn domain_ids(&self) -> impl Iterator<Item = &DomainId> {
        self.domains.keys()
    }

    /// A connected domain
    pub fn domain(&self, id: DomainId) -> PromiseResult<&Domain> {
        self.domains.get(&id).ok_or(PromiseError::UnknownDomain(id))
    }

    /// A connected domain, mutably
    pub fn domain_mut(&mut self, id: DomainId) -> PromiseResult<&mut Domain> {
        self.domains.get_mut(&id).ok_or(PromiseError::UnknownDomain(id))
    }

    /// Move every outbox's envelopes onto the wire, domains in id order
    pub fn collect(&mut self) -> PromiseResult<usize> {
        let mut collected = 0;
        for domain in self.domains.values_mut() {
            for envelope in domain.drain_outbox() {
                self.in_flight.push_back(InFlight {
                    handle: envelope.handle,
                    destination: envelope.destination,
                    bytes: envelope.to_bytes()?,
                });
                collected += 1;
            }
        }
        if collected > 0 {
            debug!(collected, in_flight = self.in_flight.len(), "Outboxes collected");
        }
        Ok(collected)
    }

    /// Messages on the wire, oldest first
    pub fn in_flight(&self) -> impl Iterator<Item = &InFlight> {
        self.in_flight.iter()
    }

    /// Number of messages on the wire
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Deliver the oldest message on the wire, if any
    pub fn deliver_next(&mut self) -> Option<DeliveryReport> {
        let message = self.in_flight.pop_front()?;
        Some(self.deliver_message(message))
    }

    /// Deliver the message with `handle`, overtaking anything older
    pub fn deliver(&mut self, handle: MessageHandle) -> PromiseResult<DeliveryReport> {
        let position = self.position(handle)?;
        let message = self
            .in_flight
            .remove(position)
            .ok_or(PromiseError::UnknownMessage(handle))?;
        Ok(self.deliver_message(message))
    }

    /// Collect and deliver until the wire is empty
    ///
    /// A message that cannot be delivered is reported and does not stop the rest.
    pub fn deliver_all(&mut self) -> PromiseResult<Vec<DeliveryReport>> {
        self.collect()?;
        let mut reports = Vec::new();
        while let Some(report) = self.deliver_next() {
            reports.push(report);
        }
        Ok(reports)
    }

    /// Lose the message with `handle` in transit
    pub fn drop_message(&mut self, handle: MessageHandle) -> PromiseResult<InFlight> {
        let position = self.position(handle)?;
        let message = self
            .in_flight
            .remove(position)
            .ok_or(PromiseError::UnknownMessage(handle))?;
        info!(%handle, destination = %message.destination, "Message dropped");
        Ok(message)
    }

    /// Deliver an already delivered message again
    pub fn replay(&mut self, handle: MessageHandle) -> PromiseResult<DeliveryReport> {
        let message = self
            .delivered
            .get(&handle)
            .cloned()
            .ok_or(PromiseError::UnknownMessage(handle))?;
        debug!(%handle, "Replaying message");
        Ok(self.deliver_message(message))
    }

    /// Handles of delivered messages, in first-delivery order
    pub fn delivered(&self) -> impl Iterator<Item = &MessageHandle> {
        self.delivered.keys()
    }

    /// Deliver everything, then drive every domain, until a round changes nothing
    ///
    /// Returns the number of rounds that made progress. Stops after
    /// `max_rounds` rounds even if more work remains.
    pub fn run_until_quiescent(&mut self, max_rounds: usize) -> PromiseResult<usize> {
        let mut productive = 0;
        for _ in 0..max_rounds {
            let delivered = self.deliver_all()?.len();
            let resolved: usize = self
                .domains
                .values_mut()
                .map(|domain| domain.resolve_all().resolved_count())
                .sum();
            let sent: usize = self.domains.values().map(|d| d.outbox().len()).sum();

            if delivered == 0 && resolved == 0 && sent == 0 {
                break;
            }
            productive += 1;
        }
        Ok(productive)
    }

    fn position(&self, handle: MessageHandle) -> PromiseResult<usize> {
        self.in_flight
            .iter()
            .position(|m| m.handle == handle)
            .ok_or(PromiseError::UnknownMessage(handle))
    }

    fn deliver_message(&mut self, message: InFlight) -> DeliveryReport {
        let outcome = self.hand_over(&message);
        match &outcome {
            Err(err @ (PromiseError::UnknownDomain(_) | PromiseError::Serialization(_))) => warn!(
                handle = %message.handle,
                destination = %message.destination,
                error = %err,
                "Message undeliverable"
            ),
            _ => debug!(
                handle = %message.handle,
                destination = %message.destination,
                accepted = outcome.is_ok(),
                "Message delivered"
            ),
        }

        let report = DeliveryReport {
            handle: message.handle,
            destination: message.destination,
            outcome,
        };
        self.delivered.entry(message.handle).or_insert(message);
        report
    }

    fn hand_over(&mut self, message: &InFlight) -> PromiseResult<()> {
        let envelope = Envelope::from_bytes(&message.bytes)?;
        let domain = self
            .domains
            .get_mut(&message.destination)
            .ok_or(PromiseError::UnknownDomain(message.destination))?;
        let ctx = RelayContext::for_envelope(self.transport, &envelope);
        domain.receive(&ctx, envelope)
    }
}
