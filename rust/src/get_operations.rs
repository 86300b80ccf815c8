//! GET operations for BTree.
//!
//! This module contains all the read operations of the tree: exact lookup,
//! the closest-at-or-below / closest-at-or-above queries, first and last
//! entries, and the typed accessors of the unique and bucket configurations.
//! Every read holds the store's read lock for its duration.

use crate::compare::KeyComparator;
use crate::error::TreeResult;
use crate::node::{subtree, Node};
use crate::payload::{Bucket, Payload, Single};
use crate::store::RecordStore;
use crate::types::{BTree, Entry, EntryId, NodeSearch};

/// Direction of a closest-key query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toward {
    Below,
    Above,
}

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    P: Payload,
    C: KeyComparator<K>,
    K: Clone,
{
    // ============================================================================
    // PUBLIC GET OPERATIONS
    // ============================================================================

    /// Look up the entry holding `key`.
    ///
    /// # Returns
    ///
    /// A snapshot of the entry, `None` if the key is absent, or an error if
    /// the store failed or the tree was destroyed.
    pub fn try_get_entry(&self, key: &K) -> TreeResult<Option<Entry<K, P>>> {
        let store = self.store.read();
        match self.locate(&store, key)? {
            Some((_, entry)) => Ok(Some(snapshot(&*store, entry)?)),
            None => Ok(None),
        }
    }

    /// Look up the entry holding `key`, treating any failure as absence.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, &str>::new(9).unwrap();
    /// tree.insert(1, "one").unwrap();
    ///
    /// let entry = tree.get_entry(&1).unwrap();
    /// assert_eq!(entry.key(), &1);
    /// assert_eq!(entry.payload().value(), &"one");
    /// assert!(tree.get_entry(&2).is_none());
    /// ```
    pub fn get_entry(&self, key: &K) -> Option<Entry<K, P>> {
        self.try_get_entry(key).ok().flatten()
    }

    /// Check if key exists in the tree.
    pub fn contains_key(&self, key: &K) -> bool {
        let store = self.store.read();
        matches!(self.locate(&store, key), Ok(Some(_)))
    }

    /// Entry with the greatest key that is `<= key`.
    pub fn try_closest_entry_at_or_below(&self, key: &K) -> TreeResult<Option<Entry<K, P>>> {
        let store = self.store.read();
        match self.closest(&store, key, Toward::Below)? {
            Some(entry) => Ok(Some(snapshot(&*store, entry)?)),
            None => Ok(None),
        }
    }

    /// Entry with the smallest key that is `>= key`.
    pub fn try_closest_entry_at_or_above(&self, key: &K) -> TreeResult<Option<Entry<K, P>>> {
        let store = self.store.read();
        match self.closest(&store, key, Toward::Above)? {
            Some(entry) => Ok(Some(snapshot(&*store, entry)?)),
            None => Ok(None),
        }
    }

    pub fn closest_entry_at_or_below(&self, key: &K) -> Option<Entry<K, P>> {
        self.try_closest_entry_at_or_below(key).ok().flatten()
    }

    pub fn closest_entry_at_or_above(&self, key: &K) -> Option<Entry<K, P>> {
        self.try_closest_entry_at_or_above(key).ok().flatten()
    }

    /// Entry with the smallest key.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, i32>::new(3).unwrap();
    /// assert!(tree.first_entry().is_none());
    /// for key in [5, 1, 9, 3] {
    ///     tree.insert(key, key * 10).unwrap();
    /// }
    /// assert_eq!(tree.first_entry().unwrap().key(), &1);
    /// assert_eq!(tree.last_entry().unwrap().key(), &9);
    /// ```
    pub fn first_entry(&self) -> Option<Entry<K, P>> {
        let store = self.store.read();
        let entry = self.edge_entry(&store, Toward::Below).ok().flatten()?;
        snapshot(&*store, entry).ok()
    }

    /// Entry with the greatest key.
    pub fn last_entry(&self) -> Option<Entry<K, P>> {
        let store = self.store.read();
        let entry = self.edge_entry(&store, Toward::Above).ok().flatten()?;
        snapshot(&*store, entry).ok()
    }

    // ============================================================================
    // PRIVATE HELPER METHODS FOR GET OPERATIONS
    // ============================================================================

    /// Descend from the root to the entry holding `key`, returning it
    /// together with the node that owns it.
    pub(crate) fn locate(&self, store: &S, key: &K) -> TreeResult<Option<(Node, EntryId)>> {
        let mut node = self.root_node(store)?;
        loop {
            match node.search(store, &self.comparator, key)? {
                NodeSearch::Found(entry) => return Ok(Some((node, entry))),
                NodeSearch::Gap(anchor) => match subtree(store, anchor)? {
                    Some(child) => node = child,
                    None => return Ok(None),
                },
            }
        }
    }

    /// Same descent as [`locate`](Self::locate), threading the nearest
    /// entry strictly below (or above) `key` seen so far.
    ///
    /// An entry found deeper is always nearer than the carried one, so the
    /// carry is simply replaced whenever the current gap has a neighbour on
    /// the requested side.
    fn closest(&self, store: &S, key: &K, toward: Toward) -> TreeResult<Option<EntryId>> {
        let mut node = self.root_node(store)?;
        let mut carry = None;
        loop {
            let gap = match node.search(store, &self.comparator, key)? {
                NodeSearch::Found(entry) => return Ok(Some(entry)),
                NodeSearch::Gap(anchor) => anchor,
            };
            let neighbour = match toward {
                Toward::Below => store.incoming(gap)?,
                Toward::Above => store.outgoing(gap)?,
            };
            if neighbour.is_some() {
                carry = neighbour;
            }
            match subtree(store, gap)? {
                Some(child) => node = child,
                None => return Ok(carry),
            }
        }
    }

    /// Leftmost (`Below`) or rightmost (`Above`) entry of the whole tree.
    fn edge_entry(&self, store: &S, toward: Toward) -> TreeResult<Option<EntryId>> {
        let mut node = self.root_node(store)?;
        loop {
            let layout = node.layout(store)?;
            let anchor = match toward {
                Toward::Below => node.leading(),
                Toward::Above => layout.trailing(),
            };
            match subtree(store, anchor)? {
                Some(child) => node = child,
                None => {
                    return Ok(match toward {
                        Toward::Below => layout.entries.first().copied(),
                        Toward::Above => layout.entries.last().copied(),
                    })
                }
            }
        }
    }
}

/// Owned copy of an entry's key and payload.
pub(crate) fn snapshot<S>(store: &S, entry: EntryId) -> TreeResult<Entry<S::Key, S::Payload>>
where
    S: RecordStore,
    S::Key: Clone,
    S::Payload: Clone,
{
    let record = store.entry(entry)?;
    Ok(Entry::new(record.key.clone(), record.payload.clone()))
}

// ============================================================================
// UNIQUE CONFIGURATION
// ============================================================================

impl<K, V, C, S> BTree<K, Single<V>, C, S>
where
    S: RecordStore<Key = K, Payload = Single<V>>,
    C: KeyComparator<K>,
    K: Clone,
    V: Clone,
{
    /// Get the value associated with a key.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    ///
    /// # Returns
    ///
    /// A clone of the value if the key exists, `None` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, &str>::new(9).unwrap();
    /// tree.insert(1, "one").unwrap();
    /// assert_eq!(tree.get(&1), Some("one"));
    /// assert_eq!(tree.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<V> {
        self.try_get(key).ok().flatten()
    }

    /// Get the value associated with a key, reporting store failures.
    pub fn try_get(&self, key: &K) -> TreeResult<Option<V>> {
        Ok(self.try_get_entry(key)?.map(into_value))
    }

    /// Value of the greatest key `<= key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, char>::new(9).unwrap();
    /// tree.insert(10, 'a').unwrap();
    /// tree.insert(20, 'b').unwrap();
    ///
    /// assert_eq!(tree.closest_at_or_below(&15), Some('a'));
    /// assert_eq!(tree.closest_at_or_below(&20), Some('b'));
    /// assert_eq!(tree.closest_at_or_below(&5), None);
    /// ```
    pub fn closest_at_or_below(&self, key: &K) -> Option<V> {
        self.closest_entry_at_or_below(key).map(into_value)
    }

    /// Value of the smallest key `>= key`.
    pub fn closest_at_or_above(&self, key: &K) -> Option<V> {
        self.closest_entry_at_or_above(key).map(into_value)
    }
}

fn into_value<K, V>(entry: Entry<K, Single<V>>) -> V {
    entry.into_parts().1.into_value()
}

// ============================================================================
// BUCKET CONFIGURATION
// ============================================================================

impl<K, V, C, S> BTree<K, Bucket<V>, C, S>
where
    S: RecordStore<Key = K, Payload = Bucket<V>>,
    C: KeyComparator<K>,
    K: Clone,
    V: Clone + PartialEq,
{
    /// Every value stored under `key`; empty if the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::BucketTree;
    ///
    /// let tree = BucketTree::<&str, u32>::new(25).unwrap();
    /// tree.insert("k", 1).unwrap();
    /// tree.insert("k", 2).unwrap();
    ///
    /// let mut values = tree.get(&"k");
    /// values.sort();
    /// assert_eq!(values, vec![1, 2]);
    /// assert!(tree.get(&"missing").is_empty());
    /// ```
    pub fn get(&self, key: &K) -> Vec<V> {
        self.try_get(key).unwrap_or_default()
    }

    pub fn try_get(&self, key: &K) -> TreeResult<Vec<V>> {
        Ok(self
            .try_get_entry(key)?
            .map(into_values)
            .unwrap_or_default())
    }

    /// Values of the greatest key `<= key`.
    pub fn closest_at_or_below(&self, key: &K) -> Vec<V> {
        self.closest_entry_at_or_below(key)
            .map(into_values)
            .unwrap_or_default()
    }

    /// Values of the smallest key `>= key`.
    pub fn closest_at_or_above(&self, key: &K) -> Vec<V> {
        self.closest_entry_at_or_above(key)
            .map(into_values)
            .unwrap_or_default()
    }
}

fn into_values<K, V: PartialEq>(entry: Entry<K, Bucket<V>>) -> Vec<V> {
    entry.into_parts().1.into_vec()
}

#[cfg(test)]
mod tests {
    use crate::types::{BucketTree, UniqueTree};

    fn tree_with(order: usize, keys: impl IntoIterator<Item = i32>) -> UniqueTree<i32, i32> {
        let tree = UniqueTree::new(order).unwrap();
        for key in keys {
            tree.insert(key, key * 100).unwrap();
        }
        tree
    }

    #[test]
    fn test_get_across_levels() {
        let tree = tree_with(3, 0..50);
        assert!(tree.height().unwrap() > 3);
        for key in 0..50 {
            assert_eq!(tree.get(&key), Some(key * 100));
            assert!(tree.contains_key(&key));
        }
        assert_eq!(tree.get(&50), None);
        assert_eq!(tree.try_get(&-1), Ok(None));
    }

    #[test]
    fn test_closest_on_missing_keys() {
        let tree = tree_with(4, (0..40).map(|k| k * 10));
        for probe in 0..39 {
            let key = probe * 10 + 5;
            assert_eq!(tree.closest_at_or_below(&key), Some(probe * 1000));
            assert_eq!(tree.closest_at_or_above(&key), Some((probe + 1) * 1000));
        }
        assert_eq!(tree.closest_at_or_below(&-1), None);
        assert_eq!(tree.closest_at_or_above(&391), None);
    }

    #[test]
    fn test_closest_exact_match_short_circuits() {
        let tree = tree_with(5, (0..30).map(|k| k * 2));
        for key in (0..30).map(|k| k * 2) {
            assert_eq!(tree.closest_at_or_below(&key), Some(key * 100));
            assert_eq!(tree.closest_at_or_above(&key), Some(key * 100));
        }
    }

    #[test]
    fn test_closest_on_empty_tree() {
        let tree = tree_with(9, []);
        assert_eq!(tree.closest_at_or_below(&1), None);
        assert_eq!(tree.closest_at_or_above(&1), None);
        assert!(tree.first_entry().is_none());
        assert!(tree.last_entry().is_none());
    }

    #[test]
    fn test_first_and_last_entry() {
        let tree = tree_with(3, [17, 4, 99, 23, 8, 61, 2, 45]);
        assert_eq!(tree.first_entry().unwrap().key(), &2);
        assert_eq!(tree.last_entry().unwrap().key(), &99);
    }

    #[test]
    fn test_bucket_lookups() {
        let tree = BucketTree::<i32, &str>::new(5).unwrap();
        tree.insert(10, "a").unwrap();
        tree.insert(10, "b").unwrap();
        tree.insert(20, "c").unwrap();

        let mut values = tree.get(&10);
        values.sort();
        assert_eq!(values, vec!["a", "b"]);
        assert_eq!(tree.closest_at_or_above(&11), vec!["c"]);
        assert_eq!(tree.closest_at_or_below(&19).len(), 2);
        assert!(tree.get(&15).is_empty());
    }
}
