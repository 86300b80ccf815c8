//! Property-based tests for the anchored B-tree.
//!
//! These tests verify invariants that should hold for all inputs, using
//! `BTreeMap` as an oracle where an expected answer is needed.

use std::collections::{BTreeMap, BTreeSet};

use anchored_btree::UniqueTree;
use proptest::prelude::*;

// ============================================================================
//  Strategies
// ============================================================================

fn orders() -> impl Strategy<Value = usize> {
    3usize..=12
}

fn key_lists(max_count: usize) -> impl Strategy<Value = Vec<i16>> {
    prop::collection::vec(any::<i16>(), 0..=max_count)
}

/// Operations for random testing.
#[derive(Debug, Clone)]
enum Op {
    Insert(i16, u32),
    Remove(i16),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (-64i16..64, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => (-64i16..64).prop_map(Op::Remove),
        ],
        0..=max_ops,
    )
}

fn build(order: usize, keys: &[i16]) -> UniqueTree<i16, u32> {
    let tree = UniqueTree::new(order).unwrap();
    for key in keys {
        tree.insert_if_absent(*key, *key as u32).unwrap();
    }
    tree
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// In-order traversal yields strictly increasing keys.
    #[test]
    fn traversal_is_strictly_increasing(order in orders(), keys in key_lists(300)) {
        let tree = build(order, &keys);
        let walked: Vec<i16> = tree.keys().collect();
        prop_assert!(walked.windows(2).all(|pair| pair[0] < pair[1]));

        let distinct: BTreeSet<i16> = keys.iter().copied().collect();
        prop_assert_eq!(walked, distinct.into_iter().collect::<Vec<_>>());
    }

    /// Every inserted key reads back until it is removed, and removing it
    /// returns the stored value.
    #[test]
    fn round_trip(order in orders(), keys in key_lists(200), removals in key_lists(100)) {
        let tree = build(order, &keys);
        let mut model: BTreeMap<i16, u32> = keys.iter().map(|k| (*k, *k as u32)).collect();

        for key in &removals {
            prop_assert_eq!(tree.remove(key).unwrap(), model.remove(key));
            prop_assert_eq!(tree.get(key), None);
        }
        for (key, value) in &model {
            prop_assert_eq!(tree.get(key), Some(*value));
        }
    }

    /// Fill factor and every other structural check hold after any mix of
    /// inserts and removes.
    #[test]
    fn invariants_hold_after_every_operation(order in orders(), ops in operations(150)) {
        let tree = UniqueTree::<i16, u32>::new(order).unwrap();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    tree.insert_if_absent(key, value).unwrap();
                }
                Op::Remove(key) => {
                    tree.remove(&key).unwrap();
                }
            }
            prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());
            let stats = tree.stats().unwrap();
            prop_assert_eq!(stats.anchors, stats.entries + stats.nodes + 1);
        }
    }

    /// For absent keys the closest queries return the neighbouring keys.
    #[test]
    fn closest_queries_find_neighbours(order in orders(), keys in key_lists(200), probe: i16) {
        let tree = build(order, &keys);
        let present: BTreeSet<i16> = keys.iter().copied().collect();
        prop_assume!(!present.contains(&probe));

        let below = present.range(..probe).next_back().map(|k| *k as u32);
        let above = present.range(probe..).next().map(|k| *k as u32);
        prop_assert_eq!(tree.closest_at_or_below(&probe), below);
        prop_assert_eq!(tree.closest_at_or_above(&probe), above);
    }

    /// Removing a key twice changes nothing the second time.
    #[test]
    fn second_removal_is_a_no_op(order in orders(), keys in key_lists(120), pick: prop::sample::Index) {
        prop_assume!(!keys.is_empty());
        let tree = build(order, &keys);
        let key = keys[pick.index(keys.len())];

        prop_assert_eq!(tree.remove(&key).unwrap(), Some(key as u32));
        let levels = tree.levels().unwrap();
        let anchors = tree.store_stats().anchors;

        prop_assert_eq!(tree.remove(&key).unwrap(), None);
        prop_assert_eq!(tree.levels().unwrap(), levels);
        prop_assert_eq!(tree.store_stats().anchors, anchors);
    }

    /// Teardown deletes exactly the records the tree owns.
    #[test]
    fn teardown_deletes_everything(order in orders(), keys in key_lists(200), batch in 1usize..50) {
        let tree = build(order, &keys);
        let before = tree.store_stats();

        let report = tree.destroy_all(batch).unwrap();
        prop_assert_eq!(report.entries_deleted, before.entries);
        prop_assert_eq!(report.anchors_deleted, before.anchors);
        prop_assert_eq!(
            report.commits,
            (report.entries_deleted + report.anchors_deleted) / batch + 1
        );
        prop_assert_eq!(tree.store_stats().anchors, 0);
        prop_assert_eq!(tree.store_stats().entries, 0);
    }
}
