// Copyright 2025 Cowboy AI, LLC.

//! Callback chain
//!
//! A callback is a derived promise that watches a parent promise and, once the
//! parent settles, invokes a call target with the parent's payload.
//!
//! ```text
//!            register                      resolve
//!   (none) ───────────▶ Pending ─┬─ parent matches, target ok ──▶ Resolved
//!                                ├─ parent matches, target fails ▶ Rejected
//!                                └─ parent settled the other way ▶ Rejected (not applicable)
//! ```
//!
//! Every terminal transition deletes the callback record, so "already
//! executed" is observable as "no longer exists".
//!
//! The parent does not have to exist locally when the callback is registered.
//! A never-seen parent reads as Pending and simply keeps the callback waiting
//! until the parent is created here or shared in from another domain.

mod target;

pub use target::{CallTarget, FnTarget, TargetDirectory};

use crate::codec;
use crate::errors::{PromiseError, PromiseResult};
use crate::events::PromiseEvent;
use crate::identifiers::{Address, DomainId, PromiseId};
use crate::promise::PromiseStatus;
use crate::relay::{Component, RelayMessage, Transport};
use crate::resolver::{Ledger, Resolver};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Which parent disposition a callback reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CallbackKind {
    /// Run when the parent resolves
    Then,
    /// Run when the parent rejects
    Catch,
}

impl CallbackKind {
    /// Parent status this kind runs on
    pub fn trigger(&self) -> PromiseStatus {
        match self {
            CallbackKind::Then => PromiseStatus::Resolved,
            CallbackKind::Catch => PromiseStatus::Rejected,
        }
    }
}

/// A registered continuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CallbackRecord {
    /// Watched parent promise
    pub parent: PromiseId,
    /// Call target address
    pub target: Address,
    /// Entry point on the target
    pub entry: String,
    /// Then or Catch
    pub kind: CallbackKind,
}

/// Callback records keyed by callback promise id
#[derive(Debug, Clone, Default)]
pub struct CallbackChain {
    records: HashMap<PromiseId, CallbackRecord>,
}

impl CallbackChain {
    /// Create a callback component with no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `target.entry(parent payload)` once `parent` resolves
    pub fn then(
        &mut self,
        ledger: &mut Ledger,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseId {
        self.register(ledger, parent, target, entry.into(), CallbackKind::Then)
    }

    /// Run `target.entry(parent payload)` once `parent` rejects
    pub fn on_reject(
        &mut self,
        ledger: &mut Ledger,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseId {
        self.register(ledger, parent, target, entry.into(), CallbackKind::Catch)
    }

    fn register(
        &mut self,
        ledger: &mut Ledger,
        parent: PromiseId,
        target: Address,
        entry: String,
        kind: CallbackKind,
    ) -> PromiseId {
        let id = ledger.registry.create(Component::Callback.address());
        debug!(promise_id = %id, parent = %parent, ?kind, "Callback registered");

        self.records.insert(
            id,
            CallbackRecord {
                parent,
                target,
                entry,
                kind,
            },
        );
        ledger.registry.emit(PromiseEvent::CallbackRegistered {
            id,
            parent,
            kind,
            domain: ledger.domain(),
        });
        id
    }

    /// Like [`CallbackChain::then`], but the callback executes on `destination`
    pub fn then_on(
        &mut self,
        ledger: &mut Ledger,
        transport: &mut dyn Transport,
        destination: DomainId,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseResult<PromiseId> {
        self.register_on(
            ledger,
            transport,
            destination,
            CallbackRecord {
                parent,
                target,
                entry: entry.into(),
                kind: CallbackKind::Then,
            },
        )
    }

    /// Like [`CallbackChain::on_reject`], but the callback executes on `destination`
    pub fn on_reject_on(
        &mut self,
        ledger: &mut Ledger,
        transport: &mut dyn Transport,
        destination: DomainId,
        parent: PromiseId,
        target: Address,
        entry: impl Into<String>,
    ) -> PromiseResult<PromiseId> {
        self.register_on(
            ledger,
            transport,
            destination,
            CallbackRecord {
                parent,
                target,
                entry: entry.into(),
                kind: CallbackKind::Catch,
            },
        )
    }

    /// Create the callback promise here, move its resolution rights to
    /// `destination`, and ask the counterpart there to install the record
    fn register_on(
        &mut self,
        ledger: &mut Ledger,
        transport: &mut dyn Transport,
        destination: DomainId,
        record: CallbackRecord,
    ) -> PromiseResult<PromiseId> {
        if destination == ledger.domain() {
            return Err(PromiseError::SameDomain(destination));
        }

        let callback = Component::Callback.address();
        let id = ledger.registry.create(callback);
        let transfer = ledger
            .registry
            .transfer_resolve(callback, &id, destination, callback)?;
        transport.send(Component::Registry, destination, transfer);

        let kind = record.kind;
        let parent = record.parent;
        transport.send(
            Component::Callback,
            destination,
            RelayMessage::RegisterCallback {
                id,
                parent,
                target: record.target,
                entry: record.entry,
                kind,
            },
        );

        info!(promise_id = %id, parent = %parent, to = %destination, ?kind, "Remote callback registered");
        ledger.registry.emit(PromiseEvent::CallbackRegistered {
            id,
            parent,
            kind,
            domain: destination,
        });
        Ok(id)
    }

    /// Install a record sent by the counterpart on another domain
    ///
    /// The caller is expected to have authenticated the delivery. Returns
    /// `false` when the callback promise is already settled here, which makes
    /// a replayed registration a no-op.
    pub fn receive_callback_registration(
        &mut self,
        ledger: &mut Ledger,
        id: PromiseId,
        record: CallbackRecord,
    ) -> bool {
        if ledger.status(&id).is_settled() {
            debug!(promise_id = %id, "Ignoring registration for settled callback");
            return false;
        }

        let parent = record.parent;
        let kind = record.kind;
        self.records.insert(id, record);

        debug!(promise_id = %id, parent = %parent, ?kind, "Callback registration received");
        ledger.registry.emit(PromiseEvent::CallbackRegistered {
            id,
            parent,
            kind,
            domain: ledger.domain(),
        });
        true
    }

    /// The record for callback `id`, if it has not executed yet
    pub fn get_callback(&self, id: &PromiseId) -> Option<&CallbackRecord> {
        self.records.get(id)
    }

    /// Whether callback `id` is registered here and has not executed yet
    pub fn exists(&self, id: &PromiseId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of callbacks still waiting
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no callbacks are waiting
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn finish(&mut self, ledger: &mut Ledger, id: &PromiseId, status: PromiseStatus) {
        self.records.remove(id);
        ledger
            .registry
            .emit(PromiseEvent::CallbackExecuted { id: *id, status });
    }
}

impl Resolver for CallbackChain {
    fn component(&self) -> Component {
        Component::Callback
    }

    fn pending_ids(&self) -> Vec<PromiseId> {
        self.records.keys().copied().collect()
    }

    fn can_resolve(&self, ledger: &Ledger, id: &PromiseId) -> bool {
        let Some(record) = self.records.get(id) else {
            return false;
        };
        // Rights may still be in flight from the registering domain
        if !ledger.registry.exists(id) || ledger.status(id).is_settled() {
            return false;
        }
        ledger.status(&record.parent).is_settled()
    }

    fn resolve(&mut self, ledger: &mut Ledger, id: &PromiseId) -> PromiseResult<PromiseStatus> {
        let record = self
            .records
            .get(id)
            .cloned()
            .ok_or(PromiseError::NotFound {
                component: Component::Callback,
                id: *id,
            })?;
        if !ledger.registry.exists(id) {
            return Err(PromiseError::RightsNotReceived(*id));
        }
        let status = ledger.status(id);
        if status.is_settled() {
            return Err(PromiseError::AlreadySettled { id: *id, status });
        }
        let parent_status = ledger.status(&record.parent);
        if !parent_status.is_settled() {
            return Err(PromiseError::ParentNotSettled {
                id: *id,
                parent: record.parent,
            });
        }

        let callback = Component::Callback.address();
        let parent_payload = ledger.registry.payload(&record.parent);

        if parent_status != record.kind.trigger() {
            let marker = codec::encode_not_applicable(parent_status, &parent_payload)?;
            ledger.registry.reject(callback, id, marker)?;
            self.finish(ledger, id, PromiseStatus::Rejected);

            info!(promise_id = %id, parent = %record.parent, "Callback not applicable");
            return Ok(PromiseStatus::Rejected);
        }

        let outcome = ledger
            .targets
            .invoke(&record.target, &record.entry, &parent_payload);
        let settled = match outcome {
            Ok(value) => {
                ledger.registry.resolve(callback, id, value)?;
                PromiseStatus::Resolved
            }
            Err(revert) => {
                ledger.registry.reject(callback, id, revert)?;
                PromiseStatus::Rejected
            }
        };
        self.finish(ledger, id, settled);

        info!(
            promise_id = %id,
            parent = %record.parent,
            entry = %record.entry,
            status = %settled,
            "Callback executed"
        );
        Ok(settled)
    }
}
