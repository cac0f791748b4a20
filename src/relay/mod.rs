// Copyright 2025 Cowboy AI, LLC.

//! Cross-domain relay boundary
//!
//! The transport that actually moves messages between domains is an external
//! collaborator. This module fixes what crosses that boundary:
//! - the wire messages and their envelope,
//! - the [`Transport`] seam a domain sends through,
//! - the [`RelayContext`] a delivery is attributed with, and the check every
//!   receive handler runs against it.
//!
//! [`network::Network`] is an in-memory transport for tests and simulations.

pub mod network;

use crate::callback::CallbackKind;
use crate::errors::{PromiseError, PromiseResult};
use crate::identifiers::{Address, DomainId, MessageHandle, PromiseId};
use crate::promise::PromiseStatus;
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use network::{DeliveryReport, InFlight, Network};

/// The promise components that send and receive relayed messages
///
/// A component has the same principal address on every domain, which is how
/// a receiver recognises its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Component {
    /// Promise registry
    Registry,
    /// Deferred timer
    Timer,
    /// Callback chain
    Callback,
    /// Wait-for-all aggregator
    Aggregator,
}

impl Component {
    /// Stable label, also the address derivation input
    pub fn label(&self) -> &'static str {
        match self {
            Component::Registry => "cim-promise/registry",
            Component::Timer => "cim-promise/timer",
            Component::Callback => "cim-promise/callback",
            Component::Aggregator => "cim-promise/aggregator",
        }
    }

    /// Principal address of this component (identical on every domain)
    pub fn address(&self) -> Address {
        Address::derive(self.label())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Registry => "registry",
            Component::Timer => "timer",
            Component::Callback => "callback",
            Component::Aggregator => "aggregator",
        };
        f.write_str(name)
    }
}

/// Messages exchanged between counterpart components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum RelayMessage {
    /// Read-only snapshot of a settled promise
    ShareSettled {
        /// Shared promise
        id: PromiseId,
        /// Settled status
        status: PromiseStatus,
        /// Settled payload
        #[schemars(with = "Vec<u8>")]
        payload: Bytes,
        /// Creator on the source domain
        creator: Address,
    },
    /// Resolution rights moving to the destination domain
    TransferResolver {
        /// Transferred promise
        id: PromiseId,
        /// Principal that will hold the rights
        new_resolver: Address,
        /// Number of hops the rights have made, this one included
        generation: u64,
    },
    /// Install a callback record on the destination domain
    RegisterCallback {
        /// Callback promise
        id: PromiseId,
        /// Watched parent
        parent: PromiseId,
        /// Call target
        target: Address,
        /// Entry point on the target
        entry: String,
        /// Then or Catch
        kind: CallbackKind,
    },
}

impl RelayMessage {
    /// Component that handles this message on the destination
    pub fn target_component(&self) -> Component {
        match self {
            RelayMessage::ShareSettled { .. } | RelayMessage::TransferResolver { .. } => {
                Component::Registry
            }
            RelayMessage::RegisterCallback { .. } => Component::Callback,
        }
    }

    /// Promise the message is about
    pub fn promise_id(&self) -> PromiseId {
        match self {
            RelayMessage::ShareSettled { id, .. }
            | RelayMessage::TransferResolver { id, .. }
            | RelayMessage::RegisterCallback { id, .. } => *id,
        }
    }
}

/// A relayed message plus the routing facts the transport attests to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    /// Handle returned to the sender
    pub handle: MessageHandle,
    /// Domain the message was sent from
    pub source: DomainId,
    /// Domain the message is addressed to
    pub destination: DomainId,
    /// Principal that sent it on the source domain
    pub sender: Address,
    /// Component that must handle it
    pub target: Component,
    /// The message itself
    pub message: RelayMessage,
}

impl Envelope {
    /// Serialize for the wire
    pub fn to_bytes(&self) -> PromiseResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Deserialize from the wire
    pub fn from_bytes(bytes: &[u8]) -> PromiseResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Outbound side of the external transport
///
/// Fire-and-forget: the returned handle identifies the message but promises
/// nothing about delivery.
pub trait Transport {
    /// Dispatch `message` from `sender` to its counterpart on `destination`
    fn send(
        &mut self,
        sender: Component,
        destination: DomainId,
        message: RelayMessage,
    ) -> MessageHandle;
}

/// Buffering transport owned by one domain
///
/// Envelopes wait here until a carrier (such as [`Network`]) drains them.
#[derive(Debug, Clone)]
pub struct Outbox {
    source: DomainId,
    queue: Vec<Envelope>,
}

impl Outbox {
    /// Create an empty outbox for `source`
    pub fn new(source: DomainId) -> Self {
        Self {
            source,
            queue: Vec::new(),
        }
    }

    /// Envelopes waiting to be carried
    pub fn pending(&self) -> &[Envelope] {
        &self.queue
    }

    /// Number of envelopes waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every waiting envelope in send order
    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.queue)
    }
}

impl Transport for Outbox {
    fn send(
        &mut self,
        sender: Component,
        destination: DomainId,
        message: RelayMessage,
    ) -> MessageHandle {
        let handle = MessageHandle::new();
        self.queue.push(Envelope {
            handle,
            source: self.source,
            destination,
            sender: sender.address(),
            target: message.target_component(),
            message,
        });
        handle
    }
}

/// Per-delivery context, valid only while one relayed call is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayContext {
    /// Immediate caller of the receive handler
    pub caller: Address,
    /// Domain the transport attributes the message to
    pub origin_domain: DomainId,
    /// Principal the transport attributes the message to
    pub origin_sender: Address,
}

impl RelayContext {
    /// Context the transport `caller` presents for `envelope`
    pub fn for_envelope(caller: Address, envelope: &Envelope) -> Self {
        Self {
            caller,
            origin_domain: envelope.source,
            origin_sender: envelope.sender,
        }
    }

    /// Accept the delivery only if it came through the transport from the
    /// counterpart of `component` on another domain
    pub fn authenticate(
        &self,
        component: Component,
        local_domain: DomainId,
        transport: Address,
    ) -> PromiseResult<()> {
        let refuse = |reason: String| PromiseError::UnauthorizedRelay { component, reason };

        if self.caller != transport {
            return Err(refuse(format!("caller {} is not the transport", self.caller)));
        }
        if self.origin_sender != component.address() {
            return Err(refuse(format!(
                "origin sender {} is not the {component} counterpart",
                self.origin_sender
            )));
        }
        if self.origin_domain == local_domain {
            return Err(refuse(format!("origin {} is the local domain", self.origin_domain)));
        }
        Ok(())
    }
}
