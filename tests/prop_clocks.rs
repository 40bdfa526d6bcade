use std::collections::BTreeMap;

use proptest::prelude::*;

use clocks::{
    Clock, ClockOrdering, ComparePolicy, HybridLogicalClock, LamportClock, SimpleIdentifier,
    VectorClock,
};

fn id(last: u8) -> SimpleIdentifier {
    let mut bytes = [0u8; 16];
    bytes[15] = last;
    SimpleIdentifier::from_bytes(bytes)
}

prop_compose! {
    fn lamport()(count in 0u64..u64::MAX / 2, owner in any::<u8>()) -> LamportClock {
        LamportClock::from_parts(count, id(owner))
    }
}

prop_compose! {
    fn hlc()(
        millis in 0u64..u64::MAX / 2,
        count in any::<u16>(),
        owner in any::<u8>(),
    ) -> HybridLogicalClock {
        HybridLogicalClock::from_parts(millis, count, id(owner))
    }
}

prop_compose! {
    fn vector()(
        owner in 0u8..8,
        count in 0u64..1_000_000,
        others in prop::collection::btree_map(0u8..8, 0u64..1_000_000, 0..6),
    ) -> VectorClock {
        let others: BTreeMap<SimpleIdentifier, u64> = others
            .into_iter()
            .filter(|(other, _)| *other != owner)
            .map(|(other, count)| (id(other), count))
            .collect();
        VectorClock::from_parts(count, id(owner), others).unwrap()
    }
}

proptest! {
    #[test]
    fn prop_lamport_encodings_round_trip(clock in lamport()) {
        let decoded: LamportClock = LamportClock::from_raw_value(clock.raw_value()).unwrap();
        prop_assert_eq!(decoded, clock.clone());
        let text = clock.text_value().unwrap();
        let parsed: LamportClock = LamportClock::from_text_value(&text).unwrap();
        prop_assert_eq!(parsed, clock);
    }

    #[test]
    fn prop_lamport_raw_order_matches_clock_order(a in lamport(), b in lamport()) {
        prop_assert_eq!(a.raw_value().cmp(b.raw_value()), a.cmp(&b));
    }

    #[test]
    fn prop_lamport_tick_and_tock_advance(a in lamport(), b in lamport(), now in lamport()) {
        prop_assert!(a.tick(&now) > a);
        let merged = a.tock(&now, &b);
        prop_assert!(merged > a);
        prop_assert!(merged > b);
        prop_assert_eq!(merged.id(), a.id());
        prop_assert_eq!(a.tock_all(&now, &[]), a.tick(&now));
    }

    #[test]
    fn prop_hlc_encodings_round_trip(clock in hlc()) {
        let decoded: HybridLogicalClock =
            HybridLogicalClock::from_raw_value(clock.raw_value()).unwrap();
        prop_assert_eq!(decoded, clock.clone());
        let text = clock.text_value().unwrap();
        let parsed: HybridLogicalClock = HybridLogicalClock::from_text_value(&text).unwrap();
        prop_assert_eq!(parsed, clock);
    }

    #[test]
    fn prop_hlc_raw_order_matches_clock_order(a in hlc(), b in hlc()) {
        prop_assert_eq!(a.raw_value().cmp(b.raw_value()), a.cmp(&b));
    }

    #[test]
    fn prop_hlc_tick_and_tock_advance(a in hlc(), b in hlc(), now in hlc()) {
        let ticked = a.tick(&now);
        prop_assert!(ticked > a);
        prop_assert!(ticked.milliseconds() >= now.milliseconds());

        let merged = a.tock(&now, &b);
        prop_assert!(merged > a);
        prop_assert!(merged > b);
        prop_assert_eq!(merged.id(), a.id());
        prop_assert_eq!(a.tock_all(&now, &[]), a.tick(&now));
    }

    #[test]
    fn prop_vector_encodings_round_trip(clock in vector()) {
        let decoded: VectorClock = VectorClock::from_raw_value(clock.raw_value()).unwrap();
        prop_assert_eq!(decoded.raw_value(), clock.raw_value());
        let text = clock.text_value().unwrap();
        let parsed: VectorClock = VectorClock::from_text_value(&text).unwrap();
        prop_assert_eq!(parsed, clock);
    }

    #[test]
    fn prop_vector_tock_is_after_both(a in vector(), b in vector()) {
        let merged = a.tock_now(&b);
        prop_assert_eq!(merged.compare_with(&a, ComparePolicy::FullUnion), ClockOrdering::After);
        prop_assert_eq!(merged.compare_with(&b, ComparePolicy::FullUnion), ClockOrdering::After);
        prop_assert!(merged.dominates(&a));
        prop_assert!(merged.dominates(&b));
        prop_assert_eq!(merged.id(), a.id());
    }

    #[test]
    fn prop_vector_tock_all_increments_once(
        a in vector(),
        others in prop::collection::vec(vector(), 0..4),
    ) {
        let merged = a.tock_all_now(&others);
        let seen = others
            .iter()
            .filter_map(|other| other.get(a.id()))
            .fold(a.count(), u64::max);
        prop_assert_eq!(merged.count(), seen + 1);
        if others.is_empty() {
            prop_assert_eq!(merged, a.tick_now());
        }
    }

    #[test]
    fn prop_vector_compare_is_antisymmetric(a in vector(), b in vector()) {
        for policy in [ComparePolicy::SharedKeys, ComparePolicy::FullUnion] {
            prop_assert_eq!(a.compare_with(&b, policy), b.compare_with(&a, policy).reverse());
        }
    }
}
