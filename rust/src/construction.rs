//! Construction and initialization logic for BTree.
//!
//! This module contains order validation and the constructors that lay down
//! the holder anchor, the empty root node and the root relation between them.

use std::marker::PhantomData;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::compare::KeyComparator;
use crate::error::{InitResult, TreeError};
use crate::payload::Payload;
use crate::store::{MemoryStore, RecordStore, Transaction};
use crate::types::{BTree, Relation, MIN_ORDER};

/// Validate that an order is usable.
pub fn validate_order(order: usize) -> InitResult<()> {
    if order < MIN_ORDER {
        Err(TreeError::InvalidOrder {
            order,
            minimum: MIN_ORDER,
        })
    } else {
        Ok(())
    }
}

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    C: KeyComparator<K>,
{
    /// Create a tree inside a caller-supplied store.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store the anchors and entries will live in
    /// * `order` - Maximum entries per node plus one (minimum 3)
    /// * `comparator` - Total order over keys
    pub fn with_store(mut store: S, order: usize, comparator: C) -> InitResult<Self> {
        validate_order(order)?;

        let mut txn = Transaction::begin(&mut store)?;
        let holder = txn.create_anchor()?;
        let root = txn.create_anchor()?;
        txn.create_relation(Relation::Root, holder, root)?;
        txn.commit()?;

        Ok(Self {
            order,
            comparator,
            holder,
            store: RwLock::new(store),
            _marker: PhantomData,
        })
    }

    /// Maximum number of entries per node plus one.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Minimum entries of a non-root node: `ceil(order / 2) - 1`.
    pub fn min_entries(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Maximum entries of any node: `order - 1`.
    pub fn max_entries(&self) -> usize {
        self.order - 1
    }

    /// Shared access to the underlying store.
    pub fn store(&self) -> RwLockReadGuard<'_, S> {
        self.store.read()
    }

    /// Exclusive access to the underlying store.
    ///
    /// Writing records through this guard bypasses the tree and can break
    /// its invariants; it exists for store-level settings such as fault
    /// injection.
    pub fn store_mut(&self) -> RwLockWriteGuard<'_, S> {
        self.store.write()
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

impl<K, P, C> BTree<K, P, C, MemoryStore<K, P>>
where
    K: Clone,
    P: Payload,
    C: KeyComparator<K>,
{
    /// Create an in-memory tree ordered by `comparator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::BucketTree;
    ///
    /// let by_length = |a: &String, b: &String| a.len().cmp(&b.len());
    /// let tree = BucketTree::with_comparator(25, by_length).unwrap();
    /// tree.insert("abc".to_string(), 1).unwrap();
    /// tree.insert("xyz".to_string(), 2).unwrap();
    ///
    /// // Same length, same sort key: both values share one bucket.
    /// assert_eq!(tree.len(), 1);
    /// assert_eq!(tree.get(&"---".to_string()).len(), 2);
    /// ```
    pub fn with_comparator(order: usize, comparator: C) -> InitResult<Self> {
        Self::with_store(MemoryStore::new(), order, comparator)
    }
}

impl<K, P, C> BTree<K, P, C, MemoryStore<K, P>>
where
    K: Clone,
    P: Payload,
    C: KeyComparator<K> + Default,
{
    /// Create an in-memory tree with the specified order.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, String>::new(9).unwrap();
    /// assert!(tree.is_empty());
    /// assert!(UniqueTree::<i32, String>::new(2).is_err());
    /// ```
    pub fn new(order: usize) -> InitResult<Self> {
        Self::with_comparator(order, C::default())
    }

    /// Create an in-memory tree with the payload's default order
    /// (9 for unique trees, 25 for bucket trees).
    pub fn with_default_order() -> InitResult<Self> {
        Self::new(P::DEFAULT_ORDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BucketTree, UniqueTree};

    #[test]
    fn test_tree_construction() {
        let tree = UniqueTree::<i32, String>::new(9).unwrap();
        assert_eq!(tree.order(), 9);
        assert_eq!(tree.min_entries(), 4);
        assert_eq!(tree.max_entries(), 8);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_invalid_order() {
        let result = UniqueTree::<i32, String>::new(2);
        assert_eq!(
            result.unwrap_err(),
            TreeError::InvalidOrder {
                order: 2,
                minimum: MIN_ORDER
            }
        );
    }

    #[test]
    fn test_default_orders() {
        let unique = UniqueTree::<i32, String>::with_default_order().unwrap();
        assert_eq!(unique.order(), 9);
        let bucket = BucketTree::<i32, String>::with_default_order().unwrap();
        assert_eq!(bucket.order(), 25);
        assert_eq!(bucket.min_entries(), 12);
    }

    #[test]
    fn test_construction_lays_down_root_indirection() {
        let tree = UniqueTree::<i32, i32>::new(3).unwrap();
        let stats = tree.store().stats();
        assert_eq!(stats.anchors, 2);
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.commits, 1);
        assert_eq!(tree.min_entries(), 1);
    }

    #[test]
    fn test_refused_setup_commit_fails_construction() {
        let mut store = MemoryStore::new();
        store.fail_commits_after(0);
        let err = BTree::<i32, crate::Single<i32>, _>::with_store(store, 9, crate::NaturalOrder)
            .unwrap_err();
        assert!(err.is_transaction_failure());
    }

    #[test]
    fn test_validation() {
        assert!(validate_order(9).is_ok());
        assert!(validate_order(3).is_ok());
        assert!(validate_order(2).is_err());
    }
}
