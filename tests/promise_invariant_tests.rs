// Copyright 2025 Cowboy AI, LLC.

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;

use cim_promise::codec;
use cim_promise::{
    Address, Domain, DomainConfig, ManualClock, PromiseId, PromiseRegistry, PromiseStatus,
    DomainId,
};

fn domain() -> Domain {
    Domain::new(DomainConfig::new(7), Arc::new(ManualClock::new(0)))
}

fn alice() -> Address {
    Address::derive("alice")
}

/// Input payloads together with the order in which they are settled
fn values_and_order() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<usize>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

proptest! {
    #[test]
    fn aggregate_output_follows_input_order((values, order) in values_and_order()) {
        let mut d = domain();
        let inputs: Vec<_> = values.iter().map(|_| d.create_promise(alice())).collect();
        let g = d.promise_all(inputs.clone()).unwrap();

        for (step, &index) in order.iter().enumerate() {
            prop_assert!(!d.can_resolve_aggregate(&g));
            d.resolve_promise(alice(), &inputs[index], values[index].clone()).unwrap();
            prop_assert_eq!(d.get_aggregate_status(&g).resolved, step + 1);
        }

        prop_assert!(d.can_resolve_aggregate(&g));
        prop_assert_eq!(d.resolve_aggregate(&g).unwrap(), PromiseStatus::Resolved);
        let out = codec::decode_sequence(&d.get_promise(&g).payload).unwrap();
        let expected: Vec<Bytes> = values.into_iter().map(Bytes::from).collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn aggregate_rejects_with_lowest_rejected_input(
        (values, order) in values_and_order(),
        reject_mask in proptest::collection::vec(any::<bool>(), 8),
    ) {
        prop_assume!(values.iter().enumerate().any(|(i, _)| reject_mask[i]));
        let mut d = domain();
        let inputs: Vec<_> = values.iter().map(|_| d.create_promise(alice())).collect();
        let g = d.promise_all(inputs.clone()).unwrap();

        for &index in &order {
            let payload = values[index].clone();
            if reject_mask[index] {
                d.reject_promise(alice(), &inputs[index], payload).unwrap();
            } else {
                d.resolve_promise(alice(), &inputs[index], payload).unwrap();
            }
        }

        let first = (0..values.len()).find(|&i| reject_mask[i]).unwrap();
        prop_assert_eq!(d.resolve_aggregate(&g).unwrap(), PromiseStatus::Rejected);
        prop_assert_eq!(d.get_promise(&g).payload, Bytes::from(values[first].clone()));
    }

    #[test]
    fn settles_at_most_once(attempts in proptest::collection::vec(any::<bool>(), 1..10)) {
        let mut d = domain();
        let p = d.create_promise(alice());

        for (i, &resolve) in attempts.iter().enumerate() {
            let payload = vec![i as u8];
            let outcome = if resolve {
                d.resolve_promise(alice(), &p, payload)
            } else {
                d.reject_promise(alice(), &p, payload)
            };
            prop_assert_eq!(outcome.is_ok(), i == 0);
        }

        let expected = if attempts[0] { PromiseStatus::Resolved } else { PromiseStatus::Rejected };
        prop_assert_eq!(d.status(&p), expected);
        prop_assert_eq!(d.get_promise(&p).payload, Bytes::from(vec![0u8]));
    }

    #[test]
    fn unknown_ids_read_as_pending(bytes in any::<[u8; 32]>()) {
        let registry = PromiseRegistry::new(DomainId(1));
        let id = PromiseId::from_bytes(bytes);
        prop_assert_eq!(registry.status(&id), PromiseStatus::Pending);
        prop_assert!(!registry.exists(&id));
    }

    #[test]
    fn sharing_twice_equals_sharing_once(
        payload in proptest::collection::vec(any::<u8>(), 0..32),
        resolved in any::<bool>(),
    ) {
        let status = if resolved { PromiseStatus::Resolved } else { PromiseStatus::Rejected };
        let id = PromiseId::derive(DomainId(3), 0);

        let mut once = PromiseRegistry::new(DomainId(1));
        once.receive_shared(&id, status, Bytes::from(payload.clone()), alice()).unwrap();

        let mut twice = PromiseRegistry::new(DomainId(1));
        for _ in 0..2 {
            twice.receive_shared(&id, status, Bytes::from(payload.clone()), alice()).unwrap();
        }

        prop_assert_eq!(once.get_promise(&id), twice.get_promise(&id));
        prop_assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn ids_are_unique_per_domain_and_sequence(a in 0u64..64, b in 0u64..64, s in 0u64..64, t in 0u64..64) {
        let left = PromiseId::derive(DomainId(a), s);
        let right = PromiseId::derive(DomainId(b), t);
        prop_assert_eq!(left == right, a == b && s == t);
    }
}
