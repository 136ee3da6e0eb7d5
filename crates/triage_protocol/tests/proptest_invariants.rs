//! Property tests for the object-model invariants of §3/§8: TTL bounds,
//! parent/child ttl relation, and ancestors containment.

use proptest::prelude::*;
use triage_protocol::{Object, Payload};

fn arb_payload() -> impl Strategy<Value = Payload> {
    ".*".prop_map(|s| Payload::LogEntry { log_data: s })
}

proptest! {
    #[test]
    fn fresh_object_ttl_within_bounds(start_ttl in 0i64..50, payload in arb_payload()) {
        let obj = Object::new(payload, start_ttl);
        prop_assert!(obj.ttl >= 0 && obj.ttl <= start_ttl);
        prop_assert!(obj.ancestors.is_empty());
    }

    #[test]
    fn reemit_decrements_ttl_and_records_ancestor(
        start_ttl in 0i64..50,
        payload in arb_payload(),
        child_payload in arb_payload(),
    ) {
        let parent = Object::new(payload, start_ttl);
        let child = parent.reemit(child_payload);
        prop_assert_eq!(child.ttl, parent.ttl - 1);
        prop_assert!(child.ancestors.contains(&parent.kind().to_string()));
    }

    #[test]
    fn chain_of_reemissions_terminates_within_start_ttl_plus_one_hops(
        start_ttl in 0i64..20,
        payload in arb_payload(),
    ) {
        let mut current = Object::new(payload, start_ttl);
        let mut hops = 0;
        while !current.is_expired() && hops <= start_ttl + 1 {
            current = current.reemit(Payload::LogEntry { log_data: "x".into() });
            hops += 1;
        }
        prop_assert!(hops <= start_ttl + 1);
    }
}

#[test]
fn expired_object_becomes_terminal_death_log() {
    let obj = Object::new(Payload::LogEntry { log_data: "x".into() }, 0).reemit(Payload::LogEntry {
        log_data: "y".into(),
    });
    assert!(obj.is_expired());
    let death = obj.into_death_log();
    assert_eq!(death.ttl, 0);
    assert!(matches!(death.payload, Payload::DeathLog { .. }));
}
