//! Property-based invariant tests for property mappers.
//!
//! 1. Merge lookup: override if present, else base, else none.
//! 2. Merge is positional: base keys keep their order, new keys follow.
//! 3. `apply_all` runs every entry exactly once, in key order.
//! 4. Failing entries never prevent later entries from running.

use std::collections::BTreeSet;

use nativa_backend::PeerError;
use nativa_core::Element;
use nativa_runtime::PropertyMapper;
use proptest::prelude::*;

#[derive(Debug, Default)]
struct Trace(Vec<String>);

fn mapper_from(keys: &[String], tag: &'static str) -> PropertyMapper<Trace> {
    let mut mapper = PropertyMapper::new();
    for key in keys {
        let entry = format!("{tag}:{key}");
        mapper.set(key, move |trace: &mut Trace, _: &Element| {
            trace.0.push(entry.clone());
            Ok(())
        });
    }
    mapper
}

fn key_set() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[a-e]{1,2}", 0..8).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn merge_lookup_prefers_override(base_keys in key_set(), over_keys in key_set(), lookup in "[a-e]{1,2}") {
        let base = mapper_from(&base_keys, "base");
        let over = mapper_from(&over_keys, "over");
        let merged = PropertyMapper::merge(&base, &over);
        let element = Element::builder("View").build();

        let mut trace = Trace::default();
        let ran = merged.apply(&mut trace, &element, &lookup);
        if over_keys.contains(&lookup) {
            prop_assert!(ran.is_some());
            prop_assert_eq!(&trace.0, &vec![format!("over:{lookup}")]);
        } else if base_keys.contains(&lookup) {
            prop_assert!(ran.is_some());
            prop_assert_eq!(&trace.0, &vec![format!("base:{lookup}")]);
        } else {
            prop_assert!(ran.is_none());
            prop_assert!(trace.0.is_empty());
        }
    }

    #[test]
    fn merge_keeps_base_positions(base_keys in key_set(), over_keys in key_set()) {
        let merged = PropertyMapper::merge(&mapper_from(&base_keys, "b"), &mapper_from(&over_keys, "o"));
        let keys: Vec<&str> = merged.keys().collect();

        let base: Vec<&str> = base_keys.iter().map(String::as_str).collect();
        prop_assert_eq!(&keys[..base.len()], base.as_slice());
        let union: BTreeSet<&str> = base_keys.iter().chain(&over_keys).map(String::as_str).collect();
        prop_assert_eq!(keys.len(), union.len());
    }

    #[test]
    fn apply_all_runs_each_entry_once(keys in key_set()) {
        let mapper = mapper_from(&keys, "k");
        let mut trace = Trace::default();
        let report = mapper.apply_all(&mut trace, &Element::builder("View").build());
        let expected: Vec<String> = keys.iter().map(|k| format!("k:{k}")).collect();
        prop_assert_eq!(trace.0, expected);
        prop_assert_eq!(report.applied, keys);
        prop_assert!(report.failures.is_empty());
    }

    #[test]
    fn failures_are_isolated(keys in key_set(), failing in proptest::collection::vec(any::<bool>(), 8)) {
        let mut mapper = PropertyMapper::new();
        for (i, key) in keys.iter().enumerate() {
            let fail = failing[i];
            let entry = key.clone();
            mapper.set(key, move |trace: &mut Trace, _: &Element| {
                if fail {
                    return Err(PeerError::Rejected { operation: "set", reason: entry.clone() });
                }
                trace.0.push(entry.clone());
                Ok(())
            });
        }
        let mut trace = Trace::default();
        let report = mapper.apply_all(&mut trace, &Element::builder("View").build());

        let expected_ok: Vec<String> = keys.iter().enumerate().filter(|(i, _)| !failing[*i]).map(|(_, k)| k.clone()).collect();
        prop_assert_eq!(&trace.0, &expected_ok);
        prop_assert_eq!(report.applied, expected_ok);
        prop_assert_eq!(report.failures.len(), keys.len() - trace.0.len());
    }
}
