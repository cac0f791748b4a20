// Copyright 2025 Cowboy AI, LLC.

//! Relay behaviour between domains: rights transfer, remote callbacks,
//! out-of-order and replayed delivery, and spoofed attribution

use std::sync::Arc;

use bytes::Bytes;
use cim_promise::codec;
use cim_promise::{
    Address, CallbackKind, Component, Domain, DomainConfig, DomainId, Envelope, FnTarget,
    ManualClock, MessageHandle, Network, PromiseError, PromiseStatus, RelayContext, RelayMessage,
};
use pretty_assertions::assert_eq;

const X: DomainId = DomainId(1);
const Y: DomainId = DomainId(2);

fn alice() -> Address {
    Address::derive("alice")
}

fn bob() -> Address {
    Address::derive("bob")
}

fn doubler() -> Address {
    Address::derive("doubler")
}

fn network() -> Network {
    let clock = ManualClock::new(1_000);
    let mut network = Network::new();
    for id in [X, Y] {
        let mut domain = Domain::new(DomainConfig::new(id), Arc::new(clock.clone()));
        domain.register_target(
            doubler(),
            FnTarget::new("double", |payload: &[u8]| {
                let value: u64 =
                    codec::decode_value(payload).map_err(|e| Bytes::from(e.to_string()))?;
                codec::encode_value(&(value * 2)).map_err(|e| Bytes::from(e.to_string()))
            }),
        );
        network.add_domain(domain).unwrap();
    }
    network
}

fn handles(network: &Network) -> Vec<MessageHandle> {
    network.in_flight().map(|m| m.handle).collect()
}

#[test]
fn transferred_rights_move_with_the_promise() {
    let mut network = network();
    let x = network.domain_mut(X).unwrap();
    let p = x.create_promise(alice());
    x.transfer_resolve(alice(), &p, Y, bob()).unwrap();
    assert!(!x.exists(&p));

    // Nobody holds rights on X any more
    let err = x.resolve_promise(alice(), &p, "late").unwrap_err();
    assert!(err.is_authorization_error());

    network.deliver_all().unwrap();
    let y = network.domain_mut(Y).unwrap();
    assert_eq!(y.get_promise(&p).creator, bob());
    assert!(y.resolve_promise(alice(), &p, "v").is_err());
    y.resolve_promise(bob(), &p, "v").unwrap();
    y.share_settled(X, &p).unwrap();

    network.deliver_all().unwrap();
    let x = network.domain(X).unwrap();
    assert_eq!(x.status(&p), PromiseStatus::Resolved);
    assert_eq!(x.get_promise(&p).payload, Bytes::from("v"));
}

#[test]
fn transfer_checks_happen_before_sending() {
    let mut network = network();
    let x = network.domain_mut(X).unwrap();
    let p = x.create_promise(alice());

    assert_eq!(
        x.transfer_resolve(alice(), &p, X, bob()).unwrap_err(),
        PromiseError::SameDomain(X)
    );
    assert!(x.transfer_resolve(bob(), &p, Y, bob()).is_err());
    assert_eq!(
        x.share_settled(Y, &p).unwrap_err(),
        PromiseError::NotSettled(p)
    );
    assert!(x.outbox().is_empty());
    assert!(x.exists(&p));
}

#[test]
fn then_on_executes_on_destination() {
    let mut network = network();
    let p = network.domain_mut(Y).unwrap().create_promise(alice());

    let x = network.domain_mut(X).unwrap();
    let c = x.then_on(Y, p, doubler(), "double").unwrap();
    assert!(!x.exists(&c));
    assert!(!x.callback_exists(&c));

    network.deliver_all().unwrap();
    let y = network.domain_mut(Y).unwrap();
    assert!(y.callback_exists(&c));
    assert_eq!(y.get_callback(&c).unwrap().kind, CallbackKind::Then);
    assert!(!y.can_resolve_callback(&c));

    y.resolve_promise(alice(), &p, codec::encode_value(&4u64).unwrap())
        .unwrap();
    let report = y.resolve_all();
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(y.status(&c), PromiseStatus::Resolved);

    y.share_settled(X, &c).unwrap();
    network.deliver_all().unwrap();
    let x = network.domain(X).unwrap();
    let value: u64 = codec::decode_value(&x.get_promise(&c).payload).unwrap();
    assert_eq!(value, 8);
}

#[test]
fn registration_overtaking_transfer_waits() {
    let mut network = network();
    let p = network.domain_mut(Y).unwrap().create_promise(alice());
    network
        .domain_mut(Y)
        .unwrap()
        .resolve_promise(alice(), &p, codec::encode_value(&5u64).unwrap())
        .unwrap();

    let c = network
        .domain_mut(X)
        .unwrap()
        .on_reject_on(Y, p, doubler(), "double")
        .unwrap();
    network.collect().unwrap();
    let sent = handles(&network);
    assert_eq!(sent.len(), 2);
    let (transfer, registration) = (sent[0], sent[1]);

    assert!(network.deliver(registration).unwrap().accepted());
    let y = network.domain_mut(Y).unwrap();
    assert!(y.callback_exists(&c));
    assert!(!y.exists(&c));
    assert!(!y.can_resolve_callback(&c));
    assert_eq!(
        y.resolve_callback(&c).unwrap_err(),
        PromiseError::RightsNotReceived(c)
    );
    assert_eq!(y.resolve_all().resolved_count(), 0);

    assert!(network.deliver(transfer).unwrap().accepted());
    let y = network.domain_mut(Y).unwrap();
    assert!(y.can_resolve_callback(&c));

    // Parent resolved but the callback only catches, so it is not applicable
    assert_eq!(y.resolve_callback(&c).unwrap(), PromiseStatus::Rejected);
    let marker = codec::decode_not_applicable(&y.get_promise(&c).payload).unwrap();
    assert_eq!(marker.parent_status, PromiseStatus::Resolved);
}

#[test]
fn replayed_messages_change_nothing() {
    let mut network = network();
    let p = network.domain_mut(Y).unwrap().create_promise(alice());
    let c = network
        .domain_mut(X)
        .unwrap()
        .then_on(Y, p, doubler(), "double")
        .unwrap();
    network.collect().unwrap();
    let sent = handles(&network);
    network.deliver_all().unwrap();

    let y = network.domain_mut(Y).unwrap();
    y.resolve_promise(alice(), &p, codec::encode_value(&10u64).unwrap())
        .unwrap();
    y.resolve_all();
    let settled = y.get_promise(&c);
    assert_eq!(settled.status, PromiseStatus::Resolved);
    let events_before = y.events().len();

    for handle in sent {
        network.replay(handle).unwrap();
    }

    let y = network.domain(Y).unwrap();
    assert_eq!(y.get_promise(&c), settled);
    assert!(!y.callback_exists(&c));
    assert_eq!(y.events().len(), events_before);
}

#[test]
fn replayed_transfer_after_forwarding_is_ignored() {
    const Z: DomainId = DomainId(3);
    let mut network = network();
    network
        .add_domain(Domain::new(
            DomainConfig::new(Z),
            Arc::new(ManualClock::new(1_000)),
        ))
        .unwrap();

    let x = network.domain_mut(X).unwrap();
    let p = x.create_promise(alice());
    let first_hop = x.transfer_resolve(alice(), &p, Y, bob()).unwrap();
    network.deliver_all().unwrap();

    network
        .domain_mut(Y)
        .unwrap()
        .transfer_resolve(bob(), &p, Z, bob())
        .unwrap();
    network.deliver_all().unwrap();

    network.replay(first_hop).unwrap();

    // Only Z holds the rights; Y cannot settle a second copy
    let y = network.domain_mut(Y).unwrap();
    assert!(!y.exists(&p));
    assert!(y
        .resolve_promise(bob(), &p, "from y")
        .unwrap_err()
        .is_authorization_error());

    let z = network.domain_mut(Z).unwrap();
    z.reject_promise(bob(), &p, "from z").unwrap();
    assert_eq!(z.status(&p), PromiseStatus::Rejected);
    assert_eq!(network.domain(Y).unwrap().status(&p), PromiseStatus::Pending);
}

#[test]
fn replayed_share_is_idempotent() {
    let mut network = network();
    let x = network.domain_mut(X).unwrap();
    let p = x.create_promise(alice());
    x.reject_promise(alice(), &p, "no").unwrap();
    let handle = x.share_settled(Y, &p).unwrap();
    network.deliver_all().unwrap();
    let once = network.domain(Y).unwrap().get_promise(&p);

    network.replay(handle).unwrap();
    assert_eq!(network.domain(Y).unwrap().get_promise(&p), once);
}

#[test]
fn spoofed_component_is_refused() {
    let mut network = network();
    let transport = network.transport();
    let p = network.domain_mut(Y).unwrap().create_promise(alice());
    let c = cim_promise::derive_id(X, 0);

    // A registration claiming to come from X's registry instead of its callback component
    let envelope = Envelope {
        handle: MessageHandle::new(),
        source: X,
        destination: Y,
        sender: Component::Registry.address(),
        target: Component::Callback,
        message: RelayMessage::RegisterCallback {
            id: c,
            parent: p,
            target: doubler(),
            entry: "double".to_string(),
            kind: CallbackKind::Then,
        },
    };
    let y = network.domain_mut(Y).unwrap();
    let ctx = RelayContext::for_envelope(transport, &envelope);
    let err = y.receive(&ctx, envelope.clone()).unwrap_err();
    assert!(matches!(
        err,
        PromiseError::UnauthorizedRelay {
            component: Component::Callback,
            ..
        }
    ));
    assert!(!y.callback_exists(&c));

    // Loopback: the same domain posing as a remote counterpart
    let loopback = Envelope {
        source: Y,
        sender: Component::Callback.address(),
        ..envelope.clone()
    };
    let ctx = RelayContext::for_envelope(transport, &loopback);
    assert!(y.receive(&ctx, loopback).is_err());

    // A user calling the handler directly instead of the transport
    let honest = Envelope {
        sender: Component::Callback.address(),
        ..envelope
    };
    let ctx = RelayContext::for_envelope(alice(), &honest);
    assert!(y.receive(&ctx, honest.clone()).is_err());

    let ctx = RelayContext::for_envelope(transport, &honest);
    y.receive(&ctx, honest).unwrap();
    assert!(y.callback_exists(&c));
}

#[test]
fn dropped_share_leaves_reference_pending() {
    let mut network = network();
    let x = network.domain_mut(X).unwrap();
    let p = x.create_promise(alice());
    x.resolve_promise(alice(), &p, codec::encode_value(&1u64).unwrap())
        .unwrap();
    let handle = x.share_settled(Y, &p).unwrap();

    let y = network.domain_mut(Y).unwrap();
    let c = y.then(p, doubler(), "double");

    network.collect().unwrap();
    network.drop_message(handle).unwrap();
    network.run_until_quiescent(8).unwrap();

    let y = network.domain(Y).unwrap();
    assert_eq!(y.status(&c), PromiseStatus::Pending);
    assert!(y.callback_exists(&c));

    // Sharing again recovers
    network.domain_mut(X).unwrap().share_settled(Y, &p).unwrap();
    network.run_until_quiescent(8).unwrap();
    assert_eq!(network.domain(Y).unwrap().status(&c), PromiseStatus::Resolved);
}
