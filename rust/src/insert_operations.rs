//! INSERT operations for BTree.
//!
//! This module contains the insertion operations of the tree: descending to
//! the owning gap, splicing a new entry into a leaf chain, splitting nodes
//! that reach `order` entries at the median, and growing a new root when
//! the split reaches the top.

use std::fmt::Debug;

use tracing::{debug, trace};

use crate::compare::KeyComparator;
use crate::error::{ModifyResult, TreeError, TreeResult};
use crate::get_operations::snapshot;
use crate::node::{adopt, attach_child, open_gap, subtree, Node};
use crate::payload::Payload;
use crate::store::RecordStore;
use crate::types::{BTree, Entry, EntryId, NodeSearch};

/// Outcome of placing a value into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// A new entry was spliced into a leaf.
    Created(EntryId),
    /// The value joined the payload of an existing entry.
    Absorbed(EntryId),
    /// An entry for the key exists and its payload refused the value.
    Refused(EntryId),
}

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    P: Payload,
    C: KeyComparator<K>,
    K: Clone + Debug,
{
    // ============================================================================
    // PUBLIC INSERT OPERATIONS
    // ============================================================================

    /// Insert a value under a key.
    ///
    /// In a unique tree an existing key is refused with
    /// [`TreeError::DuplicateKey`]; in a bucket tree the value joins the
    /// key's bucket. Buckets hold distinct values, so inserting a value
    /// equal to one already in the bucket succeeds without storing it again.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert under
    /// * `value` - The value to store
    ///
    /// # Returns
    ///
    /// A snapshot of the entry now holding the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::{TreeError, UniqueTree};
    ///
    /// let tree = UniqueTree::<i32, &str>::new(9).unwrap();
    /// let entry = tree.insert(1, "one").unwrap();
    /// assert_eq!(entry.key(), &1);
    ///
    /// assert!(matches!(tree.insert(1, "uno"), Err(TreeError::DuplicateKey(_))));
    /// assert_eq!(tree.get(&1), Some("one"));
    /// ```
    pub fn insert(&self, key: K, value: P::Value) -> ModifyResult<Entry<K, P>> {
        self.mutate("insert", |store| match self.place(store, key, value)? {
            Placement::Created(entry) | Placement::Absorbed(entry) => snapshot(store, entry),
            Placement::Refused(entry) => Err(TreeError::DuplicateKey(format!(
                "{:?}",
                store.entry(entry)?.key
            ))),
        })
    }

    /// Insert a value unless the key's payload refuses it.
    ///
    /// # Returns
    ///
    /// `None` if a unique tree already holds the key (nothing changes),
    /// otherwise a snapshot of the entry holding the key. A bucket tree
    /// always accepts, so this behaves like [`insert`](Self::insert) there.
    ///
    /// # Examples
    ///
    /// ```
    /// use anchored_btree::UniqueTree;
    ///
    /// let tree = UniqueTree::<i32, &str>::new(9).unwrap();
    /// assert!(tree.insert_if_absent(1, "one").unwrap().is_some());
    /// assert!(tree.insert_if_absent(1, "uno").unwrap().is_none());
    /// assert_eq!(tree.get(&1), Some("one"));
    /// ```
    pub fn insert_if_absent(&self, key: K, value: P::Value) -> ModifyResult<Option<Entry<K, P>>> {
        self.mutate("insert_if_absent", |store| {
            match self.place(store, key, value)? {
                Placement::Created(entry) | Placement::Absorbed(entry) => {
                    Ok(Some(snapshot(store, entry)?))
                }
                Placement::Refused(_) => Ok(None),
            }
        })
    }

    // ============================================================================
    // PRIVATE HELPER METHODS FOR INSERT OPERATIONS
    // ============================================================================

    /// Descend to the key and either hand the value to the existing entry
    /// or splice a new entry into the leaf gap, splitting on overflow.
    pub(crate) fn place(&self, store: &mut S, key: K, value: P::Value) -> TreeResult<Placement> {
        let mut node = self.root_node(store)?;
        let gap = loop {
            match node.search(store, &self.comparator, &key)? {
                NodeSearch::Found(entry) => {
                    let record = store.entry_mut(entry)?;
                    return Ok(match record.payload.absorb(value) {
                        Ok(()) => Placement::Absorbed(entry),
                        Err(_) => Placement::Refused(entry),
                    });
                }
                NodeSearch::Gap(anchor) => match subtree(store, anchor)? {
                    Some(child) => node = child,
                    None => break anchor,
                },
            }
        };

        let end = open_gap(store, gap)?;
        let entry = store.create_entry(gap, end, key, P::from_value(value))?;
        trace!(node = %node.leading(), entry = %entry, "spliced entry into leaf");

        while node.len(store)? >= self.order {
            node = self.split(store, node)?;
        }
        Ok(Placement::Created(entry))
    }

    /// Split an overflowing node at entry `order / 2`.
    ///
    /// The median moves up into the parent right after the anchor the node
    /// hangs off; the entries after it become a new right sibling hanging
    /// off the median's end anchor. Returns the parent, which may now
    /// overflow in turn.
    fn split(&self, store: &mut S, node: Node) -> TreeResult<Node> {
        let layout = node.layout(store)?;
        let middle = self.order / 2;
        let median = layout.entries[middle];
        let right = Node::new(layout.anchors[middle + 1]);

        let parent = match node.parent(store)? {
            Some(parent) => parent,
            None => self.grow_root(store, node)?,
        };
        let parent_layout = parent.layout(store)?;
        let gap = parent_layout.anchors[parent_layout.child_index(store, node)?];

        let end = open_gap(store, gap)?;
        store.move_entry(median, gap, end)?;
        attach_child(store, end, right, parent)?;
        for anchor in &layout.anchors[middle + 1..] {
            if let Some(child) = subtree(store, *anchor)? {
                adopt(store, child, right)?;
            }
        }

        debug!(
            order = self.order,
            left = %node.leading(),
            right = %right.leading(),
            parent = %parent.leading(),
            "split node"
        );
        Ok(parent)
    }

    /// Put an empty node above the current root and make it the root.
    fn grow_root(&self, store: &mut S, old_root: Node) -> TreeResult<Node> {
        let leading = store.create_anchor()?;
        let root = Node::new(leading);
        attach_child(store, leading, old_root, root)?;
        self.replace_root(store, root)?;
        debug!(root = %leading, "tree grew a level");
        Ok(root)
    }
}
