// Copyright 2025 Cowboy AI, LLC.

//! Promise events
//!
//! Events are facts that have occurred on one domain. They are recorded in the
//! domain's event log in the order they happened and handed out through
//! [`crate::Domain::drain_events`].

use crate::callback::CallbackKind;
use crate::identifiers::{Address, DomainId, PromiseId};
use crate::promise::PromiseStatus;
use crate::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Enum of everything the promise components record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum PromiseEvent {
    /// A promise was created locally
    Created {
        /// New promise
        id: PromiseId,
        /// Principal holding resolution rights
        creator: Address,
    },
    /// A promise was resolved
    Resolved {
        /// Settled promise
        id: PromiseId,
        /// Success value
        payload: Vec<u8>,
    },
    /// A promise was rejected
    Rejected {
        /// Settled promise
        id: PromiseId,
        /// Error value
        payload: Vec<u8>,
    },
    /// A settled snapshot was sent to another domain
    Shared {
        /// Shared promise
        id: PromiseId,
        /// Destination domain
        destination: DomainId,
    },
    /// A settled snapshot arrived from another domain
    SharedReceived {
        /// Imported promise
        id: PromiseId,
        /// Status carried by the snapshot
        status: PromiseStatus,
    },
    /// Resolution rights left this domain
    ResolverTransferred {
        /// Transferred promise
        id: PromiseId,
        /// Destination domain
        destination: DomainId,
        /// Principal that will hold the rights there
        new_resolver: Address,
    },
    /// Resolution rights arrived on this domain
    ResolverReceived {
        /// Transferred promise
        id: PromiseId,
        /// Principal now holding the rights
        new_resolver: Address,
    },
    /// A deferred timer promise was created
    TimeoutCreated {
        /// Timer promise
        id: PromiseId,
        /// Absolute deadline
        deadline: Timestamp,
    },
    /// A callback was registered against a parent promise
    CallbackRegistered {
        /// Callback promise
        id: PromiseId,
        /// Watched parent
        parent: PromiseId,
        /// Then or Catch
        kind: CallbackKind,
        /// Domain the callback will execute on
        domain: DomainId,
    },
    /// A callback reached a terminal state and its record was removed
    CallbackExecuted {
        /// Callback promise
        id: PromiseId,
        /// Status the callback promise settled with
        status: PromiseStatus,
    },
    /// An aggregate over input promises was created
    AggregateCreated {
        /// Aggregate promise
        id: PromiseId,
        /// Inputs in positional order
        inputs: Vec<PromiseId>,
    },
    /// An aggregate settled and its record was removed
    AggregateSettled {
        /// Aggregate promise
        id: PromiseId,
        /// Status the aggregate settled with
        status: PromiseStatus,
    },
}

impl PromiseEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            PromiseEvent::Created { .. } => "PromiseCreated",
            PromiseEvent::Resolved { .. } => "PromiseResolved",
            PromiseEvent::Rejected { .. } => "PromiseRejected",
            PromiseEvent::Shared { .. } => "PromiseShared",
            PromiseEvent::SharedReceived { .. } => "SharedPromiseReceived",
            PromiseEvent::ResolverTransferred { .. } => "ResolverTransferred",
            PromiseEvent::ResolverReceived { .. } => "ResolverReceived",
            PromiseEvent::TimeoutCreated { .. } => "TimeoutCreated",
            PromiseEvent::CallbackRegistered { .. } => "CallbackRegistered",
            PromiseEvent::CallbackExecuted { .. } => "CallbackExecuted",
            PromiseEvent::AggregateCreated { .. } => "AggregateCreated",
            PromiseEvent::AggregateSettled { .. } => "AggregateSettled",
        }
    }

    /// The promise this event is about
    pub fn promise_id(&self) -> PromiseId {
        match self {
            PromiseEvent::Created { id, .. }
            | PromiseEvent::Resolved { id, .. }
            | PromiseEvent::Rejected { id, .. }
            | PromiseEvent::Shared { id, .. }
            | PromiseEvent::SharedReceived { id, .. }
            | PromiseEvent::ResolverTransferred { id, .. }
            | PromiseEvent::ResolverReceived { id, .. }
            | PromiseEvent::TimeoutCreated { id, .. }
            | PromiseEvent::CallbackRegistered { id, .. }
            | PromiseEvent::CallbackExecuted { id, .. }
            | PromiseEvent::AggregateCreated { id, .. }
            | PromiseEvent::AggregateSettled { id, .. } => *id,
        }
    }
}
