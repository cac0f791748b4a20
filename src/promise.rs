// Copyright 2025 Cowboy AI, LLC.

//! Promise record and status

use crate::errors::PromiseError;
use crate::identifiers::Address;
use crate::state_machine::{State, StateTransitions};
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a promise
///
/// Encoded on the wire as a single byte: 0 = Pending, 1 = Resolved,
/// 2 = Rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum PromiseStatus {
    /// Not yet settled (also what a never-seen id reads as)
    #[default]
    Pending,
    /// Settled successfully
    Resolved,
    /// Settled with an error
    Rejected,
}

impl PromiseStatus {
    /// Whether the promise has left Pending
    pub fn is_settled(&self) -> bool {
        !matches!(self, PromiseStatus::Pending)
    }

    /// Wire byte
    pub fn as_byte(&self) -> u8 {
        match self {
            PromiseStatus::Pending => 0,
            PromiseStatus::Resolved => 1,
            PromiseStatus::Rejected => 2,
        }
    }
}

impl TryFrom<u8> for PromiseStatus {
    type Error = PromiseError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(PromiseStatus::Pending),
            1 => Ok(PromiseStatus::Resolved),
            2 => Ok(PromiseStatus::Rejected),
            other => Err(PromiseError::InvalidStatus(other)),
        }
    }
}

impl From<PromiseStatus> for u8 {
    fn from(status: PromiseStatus) -> Self {
        status.as_byte()
    }
}

impl fmt::Display for PromiseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl State for PromiseStatus {
    fn name(&self) -> &'static str {
        match self {
            PromiseStatus::Pending => "Pending",
            PromiseStatus::Resolved => "Resolved",
            PromiseStatus::Rejected => "Rejected",
        }
    }

    fn is_terminal(&self) -> bool {
        self.is_settled()
    }
}

impl StateTransitions for PromiseStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (PromiseStatus::Pending, PromiseStatus::Resolved)
                | (PromiseStatus::Pending, PromiseStatus::Rejected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            PromiseStatus::Pending => vec![PromiseStatus::Resolved, PromiseStatus::Rejected],
            _ => Vec::new(),
        }
    }
}

/// A promise as stored by the registry
///
/// The zero value (`Promise::default()`) is what the registry reports for ids
/// it has never seen: Pending, no creator, empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Promise {
    /// Principal holding resolution rights
    pub creator: Address,
    /// Current status
    pub status: PromiseStatus,
    /// Success value or error value, opaque to the registry
    #[schemars(with = "Vec<u8>")]
    pub payload: Bytes,
}

impl Promise {
    /// A fresh Pending promise owned by `creator`
    pub fn pending(creator: Address) -> Self {
        Self {
            creator,
            status: PromiseStatus::Pending,
            payload: Bytes::new(),
        }
    }

    /// Whether this record stands for an existing promise
    pub fn exists(&self) -> bool {
        !self.creator.is_zero()
    }
}
