// Copyright 2025 Cowboy AI, LLC.

//! Identifier types for domains, promises, principals and relayed messages
//!
//! Promise ids are derived, never generated: any domain can recompute the id
//! of a promise created elsewhere from the creating domain's id and the local
//! sequence number it was allocated under.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const PROMISE_ID_CONTEXT: &str = "cim-promise 2025 promise id v1";
const ADDRESS_CONTEXT: &str = "cim-promise 2025 principal address v1";

/// Domain ID - identifies one independent execution domain (a chain)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct DomainId(pub u64);

impl DomainId {
    /// Get the raw numeric id
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain-{}", self.0)
    }
}

impl From<u64> for DomainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Promise ID - 256-bit, globally unique, derived from (domain, sequence)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseId([u8; 32]);

impl PromiseId {
    /// Derive the id of the `sequence`-th promise created on `domain`
    ///
    /// Pure and total. Distinct domains never collide because the domain id is
    /// part of the hashed input under a fixed derivation context.
    ///
    /// ```rust
    /// use cim_promise::{DomainId, PromiseId};
    ///
    /// let a = PromiseId::derive(DomainId(1), 0);
    /// let b = PromiseId::derive(DomainId(2), 0);
    /// assert_ne!(a, b);
    /// assert_eq!(a, PromiseId::derive(DomainId(1), 0));
    /// ```
    pub fn derive(domain: DomainId, sequence: u64) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(PROMISE_ID_CONTEXT);
        hasher.update(&domain.0.to_be_bytes());
        hasher.update(&sequence.to_be_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Free-function form of [`PromiseId::derive`]
pub fn derive_id(domain: DomainId, sequence: u64) -> PromiseId {
    PromiseId::derive(domain, sequence)
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "0x{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PromiseId(0x{})", self.to_hex())
    }
}

impl FromStr for PromiseId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for PromiseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PromiseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for PromiseId {
    fn schema_name() -> String {
        "PromiseId".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Address - a principal allowed to call operations (user, component or transport)
///
/// The all-zero address is reserved: a promise record whose creator is zero is
/// indistinguishable from one that never existed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The reserved zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from a label
    ///
    /// Every domain derives the same address for the same label, which is how
    /// a component recognises its counterpart on another domain.
    pub fn derive(label: &str) -> Self {
        let hash = blake3::derive_key(ADDRESS_CONTEXT, label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the reserved zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for Address {
    fn schema_name() -> String {
        "Address".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Message handle - returned by the transport for every dispatched message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct MessageHandle(Uuid);

impl MessageHandle {
    /// Create a new random handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
