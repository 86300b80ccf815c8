//! Iterator implementations for BTree.
//!
//! Iteration is a lazy in-order walk over the anchor chains: an explicit
//! stack of anchors still to visit replaces recursion, so memory stays
//! proportional to the tree height. The iterator holds the store's read
//! lock until it is dropped.

use std::iter::FusedIterator;

use parking_lot::RwLockReadGuard;

use crate::compare::KeyComparator;
use crate::get_operations::snapshot;
use crate::node::subtree;
use crate::store::RecordStore;
use crate::types::{AnchorId, BTree, Entry};

// ============================================================================
// ITERATOR STRUCTS
// ============================================================================

/// In-order iterator over the entries of a tree.
pub struct Entries<'a, S: RecordStore> {
    store: RwLockReadGuard<'a, S>,
    /// Anchors whose outgoing entry has not been yielded yet, innermost last.
    stack: Vec<AnchorId>,
}

/// In-order iterator over the keys of a tree.
pub struct Keys<'a, S: RecordStore> {
    entries: Entries<'a, S>,
}

// ============================================================================
// BTREE ITERATOR METHODS
// ============================================================================

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    C: KeyComparator<K>,
    K: Clone,
    P: Clone,
{
    /// Returns an iterator over all entries in key order.
    ///
    /// The iterator is finite and can be restarted by calling `entries()`
    /// again. A destroyed tree yields nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, char>::new(3).unwrap();
    /// for (key, value) in [(3, 'c'), (1, 'a'), (2, 'b')] {
    ///     tree.insert(key, value).unwrap();
    /// }
    ///
    /// let values: Vec<char> = tree
    ///     .entries()
    ///     .map(|entry| *entry.payload().value())
    ///     .collect();
    /// assert_eq!(values, vec!['a', 'b', 'c']);
    /// ```
    pub fn entries(&self) -> Entries<'_, S> {
        let store = self.store.read();
        let root = self.root_node(&store).ok();
        let mut entries = Entries {
            store,
            stack: Vec::new(),
        };
        if let Some(root) = root {
            entries.descend(root.leading());
        }
        entries
    }

    /// Returns an iterator over all keys in sorted order.
    pub fn keys(&self) -> Keys<'_, S> {
        Keys {
            entries: self.entries(),
        }
    }
}

// ============================================================================
// ENTRIES IMPLEMENTATION
// ============================================================================

impl<S: RecordStore> Entries<'_, S> {
    /// Push `anchor` and the leading anchors of its leftmost descendants.
    fn descend(&mut self, anchor: AnchorId) {
        let mut anchor = anchor;
        loop {
            self.stack.push(anchor);
            match subtree(&*self.store, anchor) {
                Ok(Some(child)) => anchor = child.leading(),
                _ => return,
            }
        }
    }
}

impl<S> Iterator for Entries<'_, S>
where
    S: RecordStore,
    S::Key: Clone,
    S::Payload: Clone,
{
    type Item = Entry<S::Key, S::Payload>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(anchor) = self.stack.pop() {
            let Ok(Some(entry)) = self.store.outgoing(anchor) else {
                continue;
            };
            let item = snapshot(&*self.store, entry).ok()?;
            let end = self.store.entry(entry).ok()?.end;
            self.descend(end);
            return Some(item);
        }
        None
    }
}

impl<S> FusedIterator for Entries<'_, S>
where
    S: RecordStore,
    S::Key: Clone,
    S::Payload: Clone,
{
}

impl<S> Iterator for Keys<'_, S>
where
    S: RecordStore,
    S::Key: Clone,
    S::Payload: Clone,
{
    type Item = S::Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| entry.into_parts().0)
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{BucketTree, UniqueTree};

    #[test]
    fn test_entries_in_order() {
        let tree = UniqueTree::<i32, i32>::new(3).unwrap();
        for key in [50, 10, 40, 20, 30, 60, 0, 70, 15, 35] {
            tree.insert(key, key + 1).unwrap();
        }
        let keys: Vec<i32> = tree.keys().collect();
        assert_eq!(keys, vec![0, 10, 15, 20, 30, 35, 40, 50, 60, 70]);

        for entry in tree.entries() {
            assert_eq!(*entry.payload().value(), entry.key() + 1);
        }
    }

    #[test]
    fn test_entries_restartable() {
        let tree = UniqueTree::<i32, i32>::new(4).unwrap();
        for key in 0..100 {
            tree.insert(key, key).unwrap();
        }
        let first: Vec<i32> = tree.keys().take(5).collect();
        let again: Vec<i32> = tree.keys().take(5).collect();
        assert_eq!(first, again);
        assert_eq!(tree.entries().count(), 100);
    }

    #[test]
    fn test_empty_and_destroyed_trees_yield_nothing() {
        let tree = UniqueTree::<i32, i32>::new(9).unwrap();
        assert_eq!(tree.entries().next(), None);

        tree.insert(1, 1).unwrap();
        tree.destroy_all(4).unwrap();
        assert_eq!(tree.entries().count(), 0);
    }

    #[test]
    fn test_bucket_entries_surface_every_value() {
        let tree = BucketTree::<&str, u8>::new(25).unwrap();
        tree.insert("k", 1).unwrap();
        tree.insert("k", 2).unwrap();
        tree.insert("j", 3).unwrap();

        let entries: Vec<_> = tree.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key(), &"j");
        let mut values = entries[1].payload().values().to_vec();
        values.sort();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_reads_after_collecting_run_beside_a_writer() {
        let tree = UniqueTree::<i32, i32>::new(5).unwrap();
        for key in 0..200 {
            tree.insert(key, key * 3).unwrap();
        }

        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for key in 1_000..1_200 {
                    tree.insert(key, key).unwrap();
                }
            });

            // The iterator's read guard is gone before the nested lookups.
            let keys: Vec<i32> = tree.keys().take_while(|key| *key < 200).collect();
            for key in &keys {
                assert_eq!(tree.get(key), Some(key * 3));
            }
            assert_eq!(keys.len(), 200);
            writer.join().unwrap();
        });

        assert_eq!(tree.len(), 400);
        tree.validate().unwrap();
    }
}
