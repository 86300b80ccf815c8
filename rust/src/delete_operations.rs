//! DELETE operations for BTree.
//!
//! This module contains the removal operations of the tree: unsplicing a
//! leaf entry, relocating the in-order successor into the slot of a removed
//! internal entry, and the rebalancing that follows an underflow. Rebalancing
//! always tries, in this order, borrowing from the left sibling, borrowing
//! from the right sibling, merging into the left sibling and merging with
//! the right sibling. A root left without entries collapses onto its only
//! child.

use tracing::{debug, trace};

use crate::compare::KeyComparator;
use crate::error::{ModifyResult, TreeError, TreeResult};
use crate::node::{adopt, close_gap, move_subtree, open_gap, subtree, Node};
use crate::payload::{Bucket, Payload, Single};
use crate::store::RecordStore;
use crate::types::{BTree, Entry, EntryId, Relation};

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    P: Payload,
    C: KeyComparator<K>,
    K: Clone,
{
    // ============================================================================
    // PUBLIC DELETE OPERATIONS
    // ============================================================================

    /// Remove a key together with its whole payload.
    ///
    /// # Returns
    ///
    /// The removed entry, or `None` if the key was absent (nothing changes).
    pub fn remove_entry(&self, key: &K) -> ModifyResult<Option<Entry<K, P>>> {
        self.mutate("remove", |store| match self.locate(store, key)? {
            Some((node, entry)) => {
                let (key, payload) = self.remove_located(store, node, entry)?;
                Ok(Some(Entry::new(key, payload)))
            }
            None => Ok(None),
        })
    }

    // ============================================================================
    // PRIVATE HELPER METHODS FOR DELETE OPERATIONS
    // ============================================================================

    /// Remove `entry`, owned by `node`, and restore the fill factor.
    pub(crate) fn remove_located(
        &self,
        store: &mut S,
        node: Node,
        entry: EntryId,
    ) -> TreeResult<(K, P)> {
        let (start, end) = {
            let record = store.entry(entry)?;
            (record.start, record.end)
        };

        if node.is_leaf(store)? {
            let removed = store.delete_entry(entry)?;
            close_gap(store, start, end)?;
            trace!(node = %node.leading(), "unspliced leaf entry");
            self.rebalance(store, node)?;
            return Ok(removed);
        }

        // The in-order successor is the first entry of the leftmost leaf
        // below the removed entry's end anchor.
        let mut leaf = subtree(store, end)?.ok_or_else(|| {
            TreeError::inconsistency(
                "Leaf/no leaf inconsistency",
                &format!("internal node {} has no subtree at {}", node.leading(), end),
            )
        })?;
        while let Some(child) = subtree(store, leaf.leading())? {
            leaf = child;
        }
        let successor = store.outgoing(leaf.leading())?.ok_or_else(|| {
            TreeError::inconsistency(
                "Too few entries",
                &format!("leaf {} holds no entries", leaf.leading()),
            )
        })?;
        let vacated = store.entry(successor)?.end;

        let removed = store.delete_entry(entry)?;
        store.move_entry(successor, start, end)?;
        close_gap(store, leaf.leading(), vacated)?;
        trace!(node = %node.leading(), leaf = %leaf.leading(), "relocated successor");
        self.rebalance(store, leaf)?;
        Ok(removed)
    }

    /// Walk up from `node` restoring the minimum fill of every node on the
    /// way, collapsing the root if it ends up empty above a single child.
    fn rebalance(&self, store: &mut S, mut node: Node) -> TreeResult<()> {
        let min = self.min_entries();
        loop {
            let len = node.len(store)?;
            let Some(parent) = node.parent(store)? else {
                if len == 0 {
                    if let Some(child) = subtree(store, node.leading())? {
                        self.collapse_root(store, node, child)?;
                    }
                }
                return Ok(());
            };
            if len >= min {
                return Ok(());
            }

            let layout = parent.layout(store)?;
            let index = layout.child_index(store, node)?;
            let left = match index {
                0 => None,
                _ => subtree(store, layout.anchors[index - 1])?,
            };
            let right = match layout.anchors.get(index + 1) {
                Some(anchor) => subtree(store, *anchor)?,
                None => None,
            };

            if let Some(left) = left {
                if left.len(store)? > min {
                    return self.borrow_from_left(store, node, left, layout.entries[index - 1]);
                }
            }
            if let Some(right) = right {
                if right.len(store)? > min {
                    return self.borrow_from_right(store, node, right, layout.entries[index]);
                }
            }
            match (left, right) {
                (Some(left), _) => self.merge(store, left, layout.entries[index - 1], node)?,
                (None, Some(right)) => self.merge(store, node, layout.entries[index], right)?,
                (None, None) => {
                    return Err(TreeError::inconsistency(
                        "Too few entries",
                        &format!("node {} has no sibling to rebalance with", node.leading()),
                    ))
                }
            }
            node = parent;
        }
    }

    /// Rotate the left sibling's last entry up into the parent and the
    /// separator down to the front of `node`.
    fn borrow_from_left(
        &self,
        store: &mut S,
        node: Node,
        left: Node,
        separator: EntryId,
    ) -> TreeResult<()> {
        let leading = node.leading();
        let (parent_left, parent_right) = {
            let record = store.entry(separator)?;
            (record.start, record.end)
        };

        let front = open_gap(store, leading)?;
        store.move_entry(separator, leading, front)?;
        move_subtree(store, leading, front)?;

        let donor_end = left.layout(store)?.trailing();
        let donor = store.incoming(donor_end)?.ok_or_else(|| {
            TreeError::inconsistency(
                "Too few entries",
                &format!("left sibling {} holds no entries", left.leading()),
            )
        })?;
        store.move_entry(donor, parent_left, parent_right)?;
        if let Some(child) = move_subtree(store, donor_end, leading)? {
            adopt(store, child, node)?;
        }
        store.delete_anchor(donor_end)?;

        trace!(node = %leading, sibling = %left.leading(), "borrowed from left sibling");
        Ok(())
    }

    /// Rotate the right sibling's first entry up into the parent and the
    /// separator down to the back of `node`.
    fn borrow_from_right(
        &self,
        store: &mut S,
        node: Node,
        right: Node,
        separator: EntryId,
    ) -> TreeResult<()> {
        let (parent_left, parent_right) = {
            let record = store.entry(separator)?;
            (record.start, record.end)
        };

        let back = store.create_anchor()?;
        store.move_entry(separator, node.layout(store)?.trailing(), back)?;

        let right_leading = right.leading();
        let donor = store.outgoing(right_leading)?.ok_or_else(|| {
            TreeError::inconsistency(
                "Too few entries",
                &format!("right sibling {} holds no entries", right_leading),
            )
        })?;
        let donor_end = store.entry(donor)?.end;
        store.move_entry(donor, parent_left, parent_right)?;
        if let Some(child) = move_subtree(store, right_leading, back)? {
            adopt(store, child, node)?;
        }
        move_subtree(store, donor_end, right_leading)?;
        close_gap(store, right_leading, donor_end)?;

        trace!(node = %node.leading(), sibling = %right_leading, "borrowed from right sibling");
        Ok(())
    }

    /// Pull `separator` down between `left` and `right` and join the two
    /// chains into `left`. The parent loses one entry and one anchor.
    fn merge(&self, store: &mut S, left: Node, separator: EntryId, right: Node) -> TreeResult<()> {
        let (parent_left, parent_right) = {
            let record = store.entry(separator)?;
            (record.start, record.end)
        };
        let right_layout = right.layout(store)?;

        store.delete_relation(Relation::Subtree, parent_right)?;
        store.delete_relation(Relation::Parent, right.leading())?;
        store.move_entry(separator, left.layout(store)?.trailing(), right.leading())?;
        close_gap(store, parent_left, parent_right)?;
        for anchor in &right_layout.anchors {
            if let Some(child) = subtree(store, *anchor)? {
                adopt(store, child, left)?;
            }
        }

        debug!(left = %left.leading(), right = %right.leading(), "merged siblings");
        Ok(())
    }

    /// Replace an empty internal root with its only child.
    fn collapse_root(&self, store: &mut S, root: Node, child: Node) -> TreeResult<()> {
        store.delete_relation(Relation::Subtree, root.leading())?;
        store.delete_relation(Relation::Parent, child.leading())?;
        self.replace_root(store, child)?;
        store.delete_anchor(root.leading())?;
        debug!(root = %child.leading(), "root collapsed");
        Ok(())
    }
}

// ============================================================================
// TYPED REMOVAL
// ============================================================================

impl<K, V, C, S> BTree<K, Single<V>, C, S>
where
    S: RecordStore<Key = K, Payload = Single<V>>,
    C: KeyComparator<K>,
    K: Clone,
    V: Clone,
{
    /// Remove a key from the tree and return its value.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, &str>::new(9).unwrap();
    /// tree.insert(1, "one").unwrap();
    /// assert_eq!(tree.remove(&1).unwrap(), Some("one"));
    /// assert_eq!(tree.remove(&1).unwrap(), None);
    /// ```
    pub fn remove(&self, key: &K) -> ModifyResult<Option<V>> {
        Ok(self
            .remove_entry(key)?
            .map(|entry| entry.into_parts().1.into_value()))
    }
}

impl<K, V, C, S> BTree<K, Bucket<V>, C, S>
where
    S: RecordStore<Key = K, Payload = Bucket<V>>,
    C: KeyComparator<K>,
    K: Clone,
    V: Clone + PartialEq,
{
    /// Remove a key with all of its values.
    pub fn remove(&self, key: &K) -> ModifyResult<Vec<V>> {
        Ok(self
            .remove_entry(key)?
            .map(|entry| entry.into_parts().1.into_vec())
            .unwrap_or_default())
    }

    /// Remove one value from a key's bucket. The key itself goes away with
    /// its last value.
    ///
    /// # Returns
    ///
    /// `true` if the value was present.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::BucketTree;
    ///
    /// let tree = BucketTree::<i32, char>::new(25).unwrap();
    /// tree.insert(7, 'a').unwrap();
    /// tree.insert(7, 'b').unwrap();
    ///
    /// assert!(tree.remove_value(&7, &'a').unwrap());
    /// assert_eq!(tree.get(&7), vec!['b']);
    /// assert!(tree.remove_value(&7, &'b').unwrap());
    /// assert!(!tree.contains_key(&7));
    /// ```
    pub fn remove_value(&self, key: &K, value: &V) -> ModifyResult<bool> {
        self.mutate("remove_value", |store| {
            let Some((node, entry)) = self.locate(store, key)? else {
                return Ok(false);
            };
            let payload = &mut store.entry_mut(entry)?.payload;
            if !payload.contains(value) {
                return Ok(false);
            }
            if payload.len() > 1 {
                payload.remove(value);
                return Ok(true);
            }
            self.remove_located(store, node, entry)?;
            Ok(true)
        })
    }
}
