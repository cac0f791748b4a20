// Copyright 2025 Cowboy AI, LLC.

//! Error types for promise operations

use crate::identifiers::{Address, DomainId, MessageHandle, PromiseId};
use crate::promise::PromiseStatus;
use crate::relay::Component;
use thiserror::Error;

/// Errors that can occur in promise operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromiseError {
    /// Caller is not the principal holding resolution rights
    #[error("Unauthorized: {caller} may not settle {id} (creator is {creator})")]
    Unauthorized {
        /// Promise being settled or transferred
        id: PromiseId,
        /// Principal that attempted the call
        caller: Address,
        /// Principal holding resolution rights
        creator: Address,
    },

    /// Promise has already left the Pending state
    #[error("Promise {id} already settled as {status}")]
    AlreadySettled {
        /// Promise that was already settled
        id: PromiseId,
        /// Its current status
        status: PromiseStatus,
    },

    /// Only settled promises may be shared
    #[error("Promise {0} is not settled")]
    NotSettled(PromiseId),

    /// Share or transfer targeting the caller's own domain
    #[error("Destination {0} is the local domain")]
    SameDomain(DomainId),

    /// Timer deadline is not strictly in the future
    #[error("Deadline {deadline} is not after current time {now}")]
    DeadlineNotFuture {
        /// Requested deadline
        deadline: u64,
        /// Current domain time
        now: u64,
    },

    /// No auxiliary record exists for the id
    #[error("{component} record not found for {id}")]
    NotFound {
        /// Component that was asked
        component: Component,
        /// Id that was looked up
        id: PromiseId,
    },

    /// Timer deadline has not been reached
    #[error("Timeout {id} not reached: deadline {deadline}, now {now}")]
    TooEarly {
        /// Timer promise
        id: PromiseId,
        /// Its deadline
        deadline: u64,
        /// Current domain time
        now: u64,
    },

    /// Callback's parent promise is still Pending
    #[error("Parent {parent} of callback {id} is not settled")]
    ParentNotSettled {
        /// Callback promise
        id: PromiseId,
        /// Watched parent promise
        parent: PromiseId,
    },

    /// Callback registered here before its resolution rights arrived
    #[error("Resolution rights for callback {0} have not arrived")]
    RightsNotReceived(PromiseId),

    /// Aggregate over an empty input list
    #[error("Aggregate requires at least one input promise")]
    EmptyInput,

    /// Aggregate inputs are neither all resolved nor any rejected
    #[error("Aggregate {id} has {resolved} of {total} inputs resolved")]
    NotAllResolved {
        /// Aggregate promise
        id: PromiseId,
        /// Inputs currently resolved
        resolved: usize,
        /// Total inputs
        total: usize,
    },

    /// Relayed message failed the transport attribution check
    #[error("Unauthorized relay to {component}: {reason}")]
    UnauthorizedRelay {
        /// Component that received the message
        component: Component,
        /// Why the attribution was refused
        reason: String,
    },

    /// Status byte outside 0..=2
    #[error("Invalid status byte: {0}")]
    InvalidStatus(u8),

    /// Network does not know the domain
    #[error("Unknown domain: {0}")]
    UnknownDomain(DomainId),

    /// No in-flight or delivered message has this handle
    #[error("Unknown message: {0}")]
    UnknownMessage(MessageHandle),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for promise operations
pub type PromiseResult<T> = Result<T, PromiseError>;

impl From<serde_json::Error> for PromiseError {
    fn from(err: serde_json::Error) -> Self {
        PromiseError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PromiseError {
    fn from(err: toml::de::Error) -> Self {
        PromiseError::Configuration(err.to_string())
    }
}

impl PromiseError {
    /// Wrong principal attempted a settle, transfer or relay delivery
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            PromiseError::Unauthorized { .. } | PromiseError::UnauthorizedRelay { .. }
        )
    }

    /// Operation on an already-settled or nonexistent record
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            PromiseError::AlreadySettled { .. } | PromiseError::NotFound { .. }
        )
    }

    /// Expected poll-and-retry condition; re-check `can_resolve` instead of failing
    pub fn is_precondition_error(&self) -> bool {
        matches!(
            self,
            PromiseError::TooEarly { .. }
                | PromiseError::ParentNotSettled { .. }
                | PromiseError::RightsNotReceived(_)
                | PromiseError::NotAllResolved { .. }
        )
    }

    /// Malformed cross-domain request rejected before dispatch
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            PromiseError::SameDomain(_) | PromiseError::NotSettled(_)
        )
    }
}
