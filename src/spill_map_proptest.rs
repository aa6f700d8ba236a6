#![cfg(test)]

// Property tests comparing ChainMap against std's HashMap as a model,
// kept inside the crate so they can exercise the unsynchronized layer
// directly.

use crate::chain_map::{ChainMap, MAX_BUCKETS};
use proptest::prelude::*;
use std::collections::HashMap;

// A small key pool keeps overwrite, removal, and null-key paths hot; ops
// shrink to shorter sequences over earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(Option<u8>, u16),
    Remove(Option<u8>),
    Get(Option<u8>),
    ContainsValue(u16),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = prop_oneof![3 => (0u8..16).prop_map(Some), 1 => Just(None)];
    prop_oneof![
        5 => (key.clone(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => key.clone().prop_map(Op::Remove),
        2 => key.prop_map(Op::Get),
        1 => any::<u16>().prop_map(Op::ContainsValue),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    // Invariants exercised against the model:
    // - get/len/contains agree with HashMap<Option<u8>, u16> after every op;
    // - remove reports presence exactly like the model;
    // - entries() flattens to the same multiset as the model;
    // - capacity stays a power of two throughout.
    #[test]
    fn prop_chain_map_matches_hashmap_model(
        ops in proptest::collection::vec(op_strategy(), 1..200),
        small_buckets in 1usize..4,
    ) {
        // A tiny initial bucket count forces plenty of resizes.
        let mut map: ChainMap<u8, u16> =
            ChainMap::with_config(1 << small_buckets, 0.75, MAX_BUCKETS, Default::default());
        let mut model: HashMap<Option<u8>, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    map.insert(k, v);
                    model.insert(k, v);
                }
                Op::Remove(k) => {
                    let removed = map.remove(k.as_ref());
                    let expected = model.remove(&k);
                    prop_assert_eq!(removed, expected);
                }
                Op::Get(k) => {
                    prop_assert_eq!(map.get(k.as_ref()), model.get(&k));
                }
                Op::ContainsValue(v) => {
                    let expected = model.values().any(|mv| *mv == v);
                    prop_assert_eq!(map.contains_value(&v), expected);
                }
                Op::Clear => {
                    map.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(map.len(), model.len());
            prop_assert_eq!(map.is_empty(), model.is_empty());
            prop_assert!(map.capacity().is_power_of_two());
        }

        // Final flattened contents must match the model exactly.
        let mut got = map.entries();
        let mut want: Vec<(Option<u8>, u16)> = model.into_iter().collect();
        got.sort();
        want.sort();
        prop_assert_eq!(got, want);
    }
}
