//! # CIM Promise
//!
//! Cross-domain promises for the Composable Information Machine.
//!
//! A promise is a record on one domain (a chain) that starts Pending and is
//! settled exactly once, as Resolved or Rejected, with an opaque payload. This
//! crate provides:
//! - **Promise Registry**: create, settle, share snapshots, transfer resolution rights
//! - **Deferred Timer**: promises that become resolvable at a deadline
//! - **Callback Chain**: Then/Catch continuations, locally or on another domain
//! - **Aggregator**: wait-for-all with fail-fast, values kept in input order
//! - **Resolution Driver**: layered scheduling over every resolver component
//! - **Relay**: the messages, envelopes and attribution checks that cross domains
//!
//! ## Design Principles
//!
//! 1. **Derived Identity**: promise ids are computed from (domain, sequence), never random
//! 2. **Settle Once**: Pending is the only state with outgoing transitions
//! 3. **Creator Authority**: only the principal holding resolution rights settles
//! 4. **Authenticated Relay**: deliveries must come through the transport from a counterpart
//! 5. **Replay Safety**: every receive handler tolerates duplicates
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cim_promise::{Address, Domain, DomainConfig, ManualClock, PromiseStatus};
//!
//! let clock = ManualClock::new(100);
//! let mut domain = Domain::new(DomainConfig::new(1), Arc::new(clock.clone()));
//!
//! let alice = Address::derive("alice");
//! let input = domain.create_promise(alice);
//! let timer = domain.set_timeout(110).unwrap();
//! let all = domain.promise_all(vec![input, timer]).unwrap();
//!
//! domain.resolve_promise(alice, &input, "ready").unwrap();
//! clock.set(110);
//! domain.resolve_all();
//!
//! assert_eq!(domain.status(&all), PromiseStatus::Resolved);
//! ```

#![warn(missing_docs)]

mod aggregator;
pub mod callback;
mod clock;
pub mod codec;
mod config;
mod domain;
mod driver;
mod errors;
mod events;
mod identifiers;
mod promise;
mod registry;
pub mod relay;
mod resolver;
pub mod state_machine;
mod timer;

// Re-export core types
pub use aggregator::{AggregateStatus, Aggregator};
pub use callback::{CallTarget, CallbackChain, CallbackKind, CallbackRecord, FnTarget, TargetDirectory};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{DomainConfig, DriverConfig, DEFAULT_TRANSPORT_LABEL};
pub use domain::Domain;
pub use driver::{DriveReport, LayerReport, ResolutionDriver};
pub use errors::{PromiseError, PromiseResult};
pub use events::PromiseEvent;
pub use identifiers::{derive_id, Address, DomainId, MessageHandle, PromiseId};
pub use promise::{Promise, PromiseStatus};
pub use registry::PromiseRegistry;
pub use relay::{
    Component, DeliveryReport, Envelope, InFlight, Network, Outbox, RelayContext, RelayMessage,
    Transport,
};
pub use resolver::{Ledger, Resolver};
pub use timer::DeferredTimer;
