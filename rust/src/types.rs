//! Core types and data structures for the anchored B-tree.
//!
//! This module contains the record identifiers, the records a store keeps for
//! anchors and entries, the relation kinds that wire nodes together, and the
//! tree handle itself.

use std::fmt;
use std::marker::PhantomData;

use parking_lot::RwLock;

use crate::compare::NaturalOrder;
use crate::store::MemoryStore;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Minimum order for any tree
pub const MIN_ORDER: usize = 3;

/// Default order of the unique (single value) configuration
pub const UNIQUE_ORDER: usize = 9;

/// Default order of the non-unique (bucketed value) configuration
pub const BUCKET_ORDER: usize = 25;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Identity of an anchor record. A node is identified by its leading anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorId(pub(crate) u32);

/// Identity of an entry edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub(crate) u32);

impl AnchorId {
    /// Raw slot index inside the store.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl EntryId {
    /// Raw slot index inside the store.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Kinds of relation between anchors. Each anchor has at most one outgoing
/// relation of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Stable holder anchor -> leading anchor of the current root node.
    Root,
    /// Anchor inside a node -> leading anchor of the child node hanging off it.
    Subtree,
    /// Leading anchor of a child node -> leading anchor of its parent node.
    Parent,
}

/// Anchor record: an identity point with no payload of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorRecord {
    /// Entry edge starting at this anchor.
    pub(crate) outgoing: Option<EntryId>,
    /// Entry edge ending at this anchor.
    pub(crate) incoming: Option<EntryId>,
    pub(crate) root: Option<AnchorId>,
    pub(crate) subtree: Option<AnchorId>,
    pub(crate) parent: Option<AnchorId>,
}

impl AnchorRecord {
    pub(crate) fn relation(&self, kind: Relation) -> Option<AnchorId> {
        match kind {
            Relation::Root => self.root,
            Relation::Subtree => self.subtree,
            Relation::Parent => self.parent,
        }
    }

    pub(crate) fn relation_mut(&mut self, kind: Relation) -> &mut Option<AnchorId> {
        match kind {
            Relation::Root => &mut self.root,
            Relation::Subtree => &mut self.subtree,
            Relation::Parent => &mut self.parent,
        }
    }

    /// True if nothing starts or ends here and no relation leaves it.
    pub(crate) fn is_detached(&self) -> bool {
        self.outgoing.is_none()
            && self.incoming.is_none()
            && self.root.is_none()
            && self.subtree.is_none()
            && self.parent.is_none()
    }
}

/// Entry edge record: one key and its payload spanning two anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord<K, P> {
    pub(crate) key: K,
    pub(crate) payload: P,
    pub(crate) start: AnchorId,
    pub(crate) end: AnchorId,
}

impl<K, P> EntryRecord<K, P> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn start(&self) -> AnchorId {
        self.start
    }

    pub fn end(&self) -> AnchorId {
        self.end
    }
}

/// Owned snapshot of one entry, as returned by lookups and iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, P> {
    key: K,
    payload: P,
}

impl<K, P> Entry<K, P> {
    pub(crate) fn new(key: K, payload: P) -> Self {
        Self { key, payload }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_parts(self) -> (K, P) {
        (self.key, self.payload)
    }
}

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Order-bounded B-tree whose nodes are chains of entry edges between anchors.
///
/// Every node is identified by its leading anchor; entries inside a node form
/// a chain ordered by key, and each anchor may carry one child subtree. The
/// tree reaches its current root through a stable holder anchor, so the root
/// can change identity while the handle stays valid.
///
/// # Type Parameters
///
/// * `K` - Key type, ordered by the comparator `C`
/// * `P` - Payload kept per key: [`Single`](crate::Single) or [`Bucket`](crate::Bucket)
/// * `C` - Key comparator, [`NaturalOrder`] by default
/// * `S` - Record store holding anchors and entries, [`MemoryStore`] by default
///
/// # Examples
///
/// ```
/// use anchored_btree::UniqueTree;
///
/// let tree = UniqueTree::<u64, &str>::new(9).unwrap();
/// tree.insert(1, "one").unwrap();
/// tree.insert(2, "two").unwrap();
///
/// assert_eq!(tree.get(&2), Some("two"));
/// assert_eq!(tree.len(), 2);
/// ```
///
/// # Locking
///
/// The store sits behind a read/write lock. Mutating operations hold the
/// write lock for their whole duration; reads and [`entries`](BTree::entries)
/// hold the read lock. Calling a mutating operation while an `entries()`
/// iterator is alive on the same thread deadlocks.
///
/// Read locks are not recursive either. A read such as `get` or `len`
/// issued inside an `entries()` loop takes the lock a second time; if
/// another thread is already queued for the write lock, that second read
/// waits behind the writer, which waits for the iterator, and the thread
/// deadlocks. Collect what the loop needs first, or only nest reads when no
/// writer can run concurrently.
pub struct BTree<K, P, C = NaturalOrder, S = MemoryStore<K, P>> {
    /// Maximum number of entries per node plus one.
    pub(crate) order: usize,
    pub(crate) comparator: C,
    /// Stable anchor holding the single root relation.
    pub(crate) holder: AnchorId,
    pub(crate) store: RwLock<S>,
    pub(crate) _marker: PhantomData<fn() -> (K, P)>,
}

impl<K, P, C, S> fmt::Debug for BTree<K, P, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("order", &self.order)
            .field("holder", &self.holder)
            .finish_non_exhaustive()
    }
}

/// Unique configuration: one value per key.
pub type UniqueTree<K, V, C = NaturalOrder> =
    BTree<K, crate::Single<V>, C, MemoryStore<K, crate::Single<V>>>;

/// Non-unique configuration: a small bucket of values per key.
pub type BucketTree<K, V, C = NaturalOrder> =
    BTree<K, crate::Bucket<V>, C, MemoryStore<K, crate::Bucket<V>>>;

/// Where a key search inside one node ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeSearch {
    /// The key is held by this entry.
    Found(EntryId),
    /// The key falls in the gap at this anchor.
    Gap(AnchorId),
}

/// Structural statistics of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub height: usize,
    pub nodes: usize,
    pub entries: usize,
    pub values: usize,
    pub anchors: usize,
}

/// Record counts and transaction activity of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub anchors: usize,
    pub entries: usize,
    pub commits: u64,
}

/// Work done by a batched teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeardownReport {
    pub entries_deleted: usize,
    pub anchors_deleted: usize,
    pub commits: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_relations_are_independent() {
        let mut anchor = AnchorRecord::default();
        assert!(anchor.is_detached());

        *anchor.relation_mut(Relation::Subtree) = Some(AnchorId(4));
        assert_eq!(anchor.relation(Relation::Subtree), Some(AnchorId(4)));
        assert_eq!(anchor.relation(Relation::Parent), None);
        assert!(!anchor.is_detached());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AnchorId(7).to_string(), "a7");
        assert_eq!(EntryId(2).to_string(), "e2");
    }
}
