//! Anchored B-tree implementation in Rust.
//!
//! This crate provides an order-bounded balanced search tree whose nodes are
//! not arrays but chains of entry edges between anchor records kept in a
//! pluggable [`RecordStore`]. One engine serves two configurations:
//!
//! * [`UniqueTree`] maps each key to exactly one value and refuses
//!   duplicate keys.
//! * [`BucketTree`] maps each key to a small bucket of values, so the same
//!   key can be inserted many times.
//!
//! Both support insertion with median split, removal with borrow/merge
//! rebalancing, closest-at-or-below / closest-at-or-above queries, in-order
//! iteration, a structural validator and a batched teardown.
//!
//! # Examples
//!
//! ```
//! use anchored_btree::UniqueTree;
//!
//! let tree = UniqueTree::<u32, &str>::with_default_order().unwrap();
//! for (key, value) in [(10, "ten"), (20, "twenty"), (30, "thirty")] {
//!     tree.insert(key, value).unwrap();
//! }
//!
//! assert_eq!(tree.get(&20), Some("twenty"));
//! assert_eq!(tree.closest_at_or_below(&25), Some("twenty"));
//! assert_eq!(tree.closest_at_or_above(&25), Some("thirty"));
//! assert_eq!(tree.remove(&10).unwrap(), Some("ten"));
//! assert_eq!(tree.keys().collect::<Vec<_>>(), vec![20, 30]);
//! tree.validate().unwrap();
//! ```

mod arena;
mod compare;
mod construction;
mod delete_operations;
mod error;
mod get_operations;
mod insert_operations;
mod iteration;
mod node;
mod payload;
mod store;
mod tree_structure;
mod types;
mod validation;

pub use compare::{KeyComparator, NaturalOrder};
pub use construction::validate_order;
pub use error::{InitResult, ModifyResult, StoreError, StoreResult, TreeError, TreeResult};
pub use iteration::{Entries, Keys};
pub use payload::{Bucket, Payload, Single};
pub use store::{MemoryStore, RecordStore};
pub use types::{
    AnchorId, AnchorRecord, BTree, BucketTree, Entry, EntryId, EntryRecord, Relation, StoreStats,
    TeardownReport, TreeStats, UniqueTree, BUCKET_ORDER, MIN_ORDER, UNIQUE_ORDER,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_round_trip() {
        let tree = UniqueTree::<i32, String>::new(4).unwrap();
        for i in 0..64 {
            tree.insert(i, format!("value{}", i)).unwrap();
        }
        assert_eq!(tree.len(), 64);
        for i in 0..64 {
            assert_eq!(tree.get(&i), Some(format!("value{}", i)));
        }
        for i in (0..64).step_by(3) {
            assert_eq!(tree.remove(&i).unwrap(), Some(format!("value{}", i)));
            assert_eq!(tree.get(&i), None);
        }
        tree.validate().unwrap();
    }

    #[test]
    fn test_custom_store_and_comparator() {
        let descending = |a: &i32, b: &i32| b.cmp(a);
        let tree: BTree<i32, Single<i32>, _> =
            BTree::with_store(MemoryStore::new(), 3, descending).unwrap();
        for i in 0..10 {
            tree.insert(i, i * 10).unwrap();
        }
        assert_eq!(tree.keys().collect::<Vec<_>>(), (0..10).rev().collect::<Vec<_>>());
        assert_eq!(tree.first_entry().unwrap().key(), &9);
        assert_eq!(tree.closest_at_or_below(&-1), Some(0));
        tree.validate().unwrap();
    }
}
