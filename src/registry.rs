// Copyright 2025 Cowboy AI, LLC.

//! Promise registry
//!
//! The registry is the sole owner of promise state on one domain. It hands out
//! ids, performs the single Pending -> settled transition, and imports or
//! exports promises across domains:
//!
//! - settled promises are *shared* as read-only snapshots, any number of times,
//!   to any number of domains;
//! - Pending promises are *transferred*: the local record is deleted and the
//!   destination becomes the only place the promise can be settled.
//!
//! Every transfer carries a generation number, one more than the last transfer
//! of that id the sending domain knows of. A domain only accepts a transfer
//! newer than any it has sent or received for the id, so a replayed transfer
//! cannot install a second authoritative copy after the rights moved on.
//!
//! Cross-domain operations return the [`RelayMessage`] to dispatch instead of
//! sending it, so the registry never depends on a transport.

use crate::errors::{PromiseError, PromiseResult};
use crate::events::PromiseEvent;
use crate::identifiers::{Address, DomainId, PromiseId};
use crate::promise::{Promise, PromiseStatus};
use crate::relay::RelayMessage;
use crate::state_machine::ensure_transition;
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info};

/// Promise store for one domain
#[derive(Debug, Clone)]
pub struct PromiseRegistry {
    domain: DomainId,
    next_sequence: u64,
    records: IndexMap<PromiseId, Promise>,
    transfers: HashMap<PromiseId, u64>,
    events: Vec<PromiseEvent>,
}

impl PromiseRegistry {
    /// Create an empty registry for `domain`
    pub fn new(domain: DomainId) -> Self {
        Self {
            domain,
            next_sequence: 0,
            records: IndexMap::new(),
            transfers: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Domain this registry belongs to
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Sequence number the next `create` will use
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Create a Pending promise; `caller` receives resolution rights
    pub fn create(&mut self, caller: Address) -> PromiseId {
        let id = PromiseId::derive(self.domain, self.next_sequence);
        self.next_sequence += 1;
        self.records.insert(id, Promise::pending(caller));

        debug!(promise_id = %id, domain = %self.domain, creator = %caller, "Promise created");
        self.emit(PromiseEvent::Created { id, creator: caller });
        id
    }

    /// Settle `id` successfully
    pub fn resolve(&mut self, caller: Address, id: &PromiseId, payload: Bytes) -> PromiseResult<()> {
        self.settle(caller, id, PromiseStatus::Resolved, payload)
    }

    /// Settle `id` with an error
    pub fn reject(&mut self, caller: Address, id: &PromiseId, payload: Bytes) -> PromiseResult<()> {
        self.settle(caller, id, PromiseStatus::Rejected, payload)
    }

    fn settle(
        &mut self,
        caller: Address,
        id: &PromiseId,
        status: PromiseStatus,
        payload: Bytes,
    ) -> PromiseResult<()> {
        let current = self.get_promise(id);
        if caller != current.creator || current.creator.is_zero() {
            return Err(PromiseError::Unauthorized {
                id: *id,
                caller,
                creator: current.creator,
            });
        }
        ensure_transition(id, &current.status, &status)?;

        let event = match status {
            PromiseStatus::Rejected => PromiseEvent::Rejected {
                id: *id,
                payload: payload.to_vec(),
            },
            _ => PromiseEvent::Resolved {
                id: *id,
                payload: payload.to_vec(),
            },
        };
        if let Some(record) = self.records.get_mut(id) {
            record.status = status;
            record.payload = payload;
        }

        info!(promise_id = %id, domain = %self.domain, status = %status, "Promise settled");
        self.emit(event);
        Ok(())
    }

    /// Status of `id`; never-seen ids read as Pending
    pub fn status(&self, id: &PromiseId) -> PromiseStatus {
        self.records.get(id).map(|p| p.status).unwrap_or_default()
    }

    /// Whether `id` exists locally (the only way to tell it from a never-seen id)
    pub fn exists(&self, id: &PromiseId) -> bool {
        self.records.get(id).is_some_and(Promise::exists)
    }

    /// Full record of `id`, or the zero value for never-seen ids
    pub fn get_promise(&self, id: &PromiseId) -> Promise {
        self.records.get(id).cloned().unwrap_or_default()
    }

    /// Payload of `id` without cloning the record
    pub fn payload(&self, id: &PromiseId) -> Bytes {
        self.records
            .get(id)
            .map(|p| p.payload.clone())
            .unwrap_or_default()
    }

    /// Principal holding resolution rights for `id` (zero if none here)
    pub fn creator_of(&self, id: &PromiseId) -> Address {
        self.records.get(id).map(|p| p.creator).unwrap_or_default()
    }

    /// Build the snapshot message sharing settled `id` with `destination`
    pub fn share_settled(
        &mut self,
        id: &PromiseId,
        destination: DomainId,
    ) -> PromiseResult<RelayMessage> {
        if destination == self.domain {
            return Err(PromiseError::SameDomain(destination));
        }
        let promise = self.get_promise(id);
        if !promise.status.is_settled() {
            return Err(PromiseError::NotSettled(*id));
        }

        info!(promise_id = %id, from = %self.domain, to = %destination, "Sharing settled promise");
        self.emit(PromiseEvent::Shared {
            id: *id,
            destination,
        });
        Ok(RelayMessage::ShareSettled {
            id: *id,
            status: promise.status,
            payload: promise.payload,
            creator: promise.creator,
        })
    }

    /// Apply a settled snapshot from another domain (last write wins)
    pub fn receive_shared(
        &mut self,
        id: &PromiseId,
        status: PromiseStatus,
        payload: Bytes,
        creator: Address,
    ) -> PromiseResult<()> {
        if !status.is_settled() {
            return Err(PromiseError::NotSettled(*id));
        }
        self.records.insert(
            *id,
            Promise {
                creator,
                status,
                payload,
            },
        );

        debug!(promise_id = %id, domain = %self.domain, status = %status, "Shared promise received");
        self.emit(PromiseEvent::SharedReceived { id: *id, status });
        Ok(())
    }

    /// Hand resolution rights for Pending `id` to `new_resolver` on `destination`
    ///
    /// The local record is deleted immediately; `id` reads as never-seen here
    /// until a settled snapshot is shared back.
    pub fn transfer_resolve(
        &mut self,
        caller: Address,
        id: &PromiseId,
        destination: DomainId,
        new_resolver: Address,
    ) -> PromiseResult<RelayMessage> {
        if destination == self.domain {
            return Err(PromiseError::SameDomain(destination));
        }
        let current = self.get_promise(id);
        if caller != current.creator || current.creator.is_zero() {
            return Err(PromiseError::Unauthorized {
                id: *id,
                caller,
                creator: current.creator,
            });
        }
        if current.status.is_settled() {
            return Err(PromiseError::AlreadySettled {
                id: *id,
                status: current.status,
            });
        }

        let generation = self.transfer_generation(id) + 1;
        self.transfers.insert(*id, generation);
        self.records.shift_remove(id);

        info!(
            promise_id = %id,
            from = %self.domain,
            to = %destination,
            new_resolver = %new_resolver,
            generation,
            "Resolution rights transferred"
        );
        self.emit(PromiseEvent::ResolverTransferred {
            id: *id,
            destination,
            new_resolver,
        });
        Ok(RelayMessage::TransferResolver {
            id: *id,
            new_resolver,
            generation,
        })
    }

    /// Install resolution rights received from another domain
    ///
    /// Returns `false` without touching state when `generation` is not newer
    /// than every transfer of `id` seen here, or when `id` is already settled
    /// here. A replayed transfer can neither reopen a settled promise nor
    /// revive rights that have since moved to another domain.
    pub fn receive_resolver_transfer(
        &mut self,
        id: &PromiseId,
        new_resolver: Address,
        generation: u64,
    ) -> bool {
        let seen = self.transfer_generation(id);
        if generation <= seen {
            debug!(promise_id = %id, domain = %self.domain, generation, seen, "Ignoring stale transfer");
            return false;
        }
        if self.status(id).is_settled() {
            debug!(promise_id = %id, domain = %self.domain, "Ignoring transfer for settled promise");
            return false;
        }
        self.transfers.insert(*id, generation);
        self.records.insert(*id, Promise::pending(new_resolver));

        debug!(promise_id = %id, domain = %self.domain, new_resolver = %new_resolver, "Resolution rights received");
        self.emit(PromiseEvent::ResolverReceived {
            id: *id,
            new_resolver,
        });
        true
    }

    /// Latest transfer generation of `id` sent or received here (0 if none)
    pub fn transfer_generation(&self, id: &PromiseId) -> u64 {
        self.transfers.get(id).copied().unwrap_or(0)
    }

    /// Position of `id` in first-seen order, if it has a local record
    pub fn position(&self, id: &PromiseId) -> Option<usize> {
        self.records.get_index_of(id)
    }

    /// Every id with a local record, in first-seen order
    pub fn known_ids(&self) -> impl Iterator<Item = &PromiseId> {
        self.records.keys()
    }

    /// Number of local records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no local records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn emit(&mut self, event: PromiseEvent) {
        self.events.push(event);
    }

    /// Events recorded so far
    pub fn events(&self) -> &[PromiseEvent] {
        &self.events
    }

    /// Take all recorded events
    pub fn drain_events(&mut self) -> Vec<PromiseEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn test_create_derives_sequential_ids() {
        let mut registry = PromiseRegistry::new(DomainId(5));
        let first = registry.create(alice());
        let second = registry.create(alice());

        assert_eq!(first, PromiseId::derive(DomainId(5), 0));
        assert_eq!(second, PromiseId::derive(DomainId(5), 1));
        assert_eq!(registry.next_sequence(), 2);
        assert_eq!(registry.get_promise(&first), Promise::pending(alice()));
        assert_eq!(registry.events()[0].event_type(), "PromiseCreated");
    }

    #[test]
    fn test_resolve_once() {
        let mut registry = PromiseRegistry::new(DomainId(1));
        let id = registry.create(alice());

        registry.resolve(alice(), &id, Bytes::from_static(b"abc")).unwrap();
        assert_eq!(registry.status(&id), PromiseStatus::Resolved);
        assert_eq!(registry.payload(&id), Bytes::from_static(b"abc"));

        let err = registry
            .resolve(alice(), &id, Bytes::from_static(b"xyz"))
            .unwrap_err();
        assert_eq!(
            err,
            PromiseError::AlreadySettled {
                id,
                status: PromiseStatus::Resolved
            }
        );
        let err = registry.reject(alice(), &id, Bytes::new()).unwrap_err();
        assert!(err.is_state_error());
        assert_eq!(registry.payload(&id), Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_only_creator_settles() {
        let mut registry = PromiseRegistry::new(DomainId(1));
        let id = registry.create(alice());

        let err = registry.reject(bob(), &id, Bytes::new()).unwrap_err();
        assert_eq!(
            err,
            PromiseError::Unauthorized {
                id,
                caller: bob(),
                creator: alice()
            }
        );
        assert_eq!(registry.status(&id), PromiseStatus::Pending);
    }

    #[test]
    fn test_unknown_id_reads_as_pending_without_creator() {
        let mut registry = PromiseRegistry::new(DomainId(1));
        let ghost = PromiseId::derive(DomainId(2), 9);

        assert_eq!(registry.status(&ghost), PromiseStatus::Pending);
        assert!(!registry.exists(&ghost));
        assert_eq!(registry.get_promise(&ghost), Promise::default());

        // Nobody can settle a promise that is not here, not even the zero address
        let err = registry.resolve(Address::ZERO, &ghost, Bytes::new()).unwrap_err();
        assert!(err.is_authorization_error());
    }

    #[test]
    fn test_share_requires_settled_and_foreign_destination() {
        let mut registry = PromiseRegistry::new(DomainId(1));
        let id = registry.create(alice());

        assert_eq!(
            registry.share_settled(&id, DomainId(2)).unwrap_err(),
            PromiseError::NotSettled(id)
        );

        registry.reject(alice(), &id, Bytes::from_static(b"err")).unwrap();
        assert_eq!(
            registry.share_settled(&id, DomainId(1)).unwrap_err(),
            PromiseError::SameDomain(DomainId(1))
        );

        let message = registry.share_settled(&id, DomainId(2)).unwrap();
        assert_eq!(
            message,
            RelayMessage::ShareSettled {
                id,
                status: PromiseStatus::Rejected,
                payload: Bytes::from_static(b"err"),
                creator: alice(),
            }
        );
    }

    #[test]
    fn test_receive_shared_is_idempotent() {
        let mut registry = PromiseRegistry::new(DomainId(2));
        let id = PromiseId::derive(DomainId(1), 0);

        for _ in 0..2 {
            registry
                .receive_shared(&id, PromiseStatus::Resolved, Bytes::from_static(b"v"), alice())
                .unwrap();
        }
        assert!(registry.exists(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get_promise(&id),
            Promise {
                creator: alice(),
                status: PromiseStatus::Resolved,
                payload: Bytes::from_static(b"v"),
            }
        );

        let err = registry
            .receive_shared(&id, PromiseStatus::Pending, Bytes::new(), alice())
            .unwrap_err();
        assert_eq!(err, PromiseError::NotSettled(id));
    }

    #[test]
    fn test_transfer_deletes_local_record() {
        let mut source = PromiseRegistry::new(DomainId(1));
        let id = source.create(alice());

        assert!(source
            .transfer_resolve(bob(), &id, DomainId(2), bob())
            .unwrap_err()
            .is_authorization_error());
        assert_eq!(
            source.transfer_resolve(alice(), &id, DomainId(1), bob()).unwrap_err(),
            PromiseError::SameDomain(DomainId(1))
        );

        let message = source.transfer_resolve(alice(), &id, DomainId(2), bob()).unwrap();
        assert!(!source.exists(&id));
        assert_eq!(source.status(&id), PromiseStatus::Pending);
        assert!(source.known_ids().next().is_none());

        let mut destination = PromiseRegistry::new(DomainId(2));
        if let RelayMessage::TransferResolver {
            id,
            new_resolver,
            generation,
        } = message
        {
            assert_eq!(generation, 1);
            assert!(destination.receive_resolver_transfer(&id, new_resolver, generation));
        } else {
            panic!("expected transfer message, got {message:?}");
        }
        assert_eq!(destination.creator_of(&id), bob());
        destination.resolve(bob(), &id, Bytes::new()).unwrap();
    }

    #[test]
    fn test_transfer_of_settled_promise_fails() {
        let mut registry = PromiseRegistry::new(DomainId(1));
        let id = registry.create(alice());
        registry.resolve(alice(), &id, Bytes::new()).unwrap();

        let err = registry
            .transfer_resolve(alice(), &id, DomainId(2), bob())
            .unwrap_err();
        assert!(err.is_state_error());
        assert!(registry.exists(&id));
    }

    #[test]
    fn test_replayed_transfer_never_reopens_settled_promise() {
        let mut registry = PromiseRegistry::new(DomainId(2));
        let id = PromiseId::derive(DomainId(1), 0);

        assert!(registry.receive_resolver_transfer(&id, bob(), 1));
        registry.resolve(bob(), &id, Bytes::from_static(b"done")).unwrap();

        assert!(!registry.receive_resolver_transfer(&id, bob(), 1));
        assert_eq!(registry.status(&id), PromiseStatus::Resolved);
    }

    #[test]
    fn test_replayed_transfer_cannot_revive_forwarded_rights() {
        let mut middle = PromiseRegistry::new(DomainId(2));
        let id = PromiseId::derive(DomainId(1), 0);

        assert!(middle.receive_resolver_transfer(&id, bob(), 1));
        let onward = middle.transfer_resolve(bob(), &id, DomainId(3), alice()).unwrap();
        assert!(matches!(
            onward,
            RelayMessage::TransferResolver { generation: 2, .. }
        ));

        // The first hop arrives again after the rights moved on
        assert!(!middle.receive_resolver_transfer(&id, bob(), 1));
        assert!(!middle.exists(&id));
        assert_eq!(middle.transfer_generation(&id), 2);

        // A later hop bringing the rights back is accepted
        assert!(middle.receive_resolver_transfer(&id, bob(), 3));
        assert_eq!(middle.creator_of(&id), bob());
    }
}
