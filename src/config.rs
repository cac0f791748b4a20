// Copyright 2025 Cowboy AI, LLC.

//! Configuration for domains and the resolution driver

use crate::errors::{PromiseError, PromiseResult};
use crate::identifiers::{Address, DomainId};
use serde::{Deserialize, Serialize};

/// Default principal the in-memory transport delivers as
pub const DEFAULT_TRANSPORT_LABEL: &str = "cim-promise/relay";

/// Configuration for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Id of this domain, mixed into every promise id created here
    pub domain_id: DomainId,

    /// The only principal allowed to deliver relayed messages
    #[serde(default = "default_transport")]
    pub transport: Address,
}

fn default_transport() -> Address {
    Address::derive(DEFAULT_TRANSPORT_LABEL)
}

impl DomainConfig {
    /// Configuration for `domain_id` with the default transport
    pub fn new(domain_id: impl Into<DomainId>) -> Self {
        Self {
            domain_id: domain_id.into(),
            transport: default_transport(),
        }
    }

    /// Use a different transport principal
    pub fn with_transport(mut self, transport: Address) -> Self {
        self.transport = transport;
        self
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> PromiseResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never authenticate a delivery
    pub fn validate(&self) -> PromiseResult<()> {
        if self.transport.is_zero() {
            return Err(PromiseError::Configuration(
                "transport address must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the layered resolution driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Upper bound on layers per `resolve_all` call
    pub max_layers: usize,

    /// Upper bound on pending records scanned per layer
    pub scan_limit: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_layers: 32,
            scan_limit: 10_000,
        }
    }
}

impl DriverConfig {
    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> PromiseResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Both bounds must be positive
    pub fn validate(&self) -> PromiseResult<()> {
        if self.max_layers == 0 {
            return Err(PromiseError::Configuration(
                "max_layers must be at least 1".to_string(),
            ));
        }
        if self.scan_limit == 0 {
            return Err(PromiseError::Configuration(
                "scan_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
