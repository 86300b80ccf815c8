//! Node views and the splice primitives shared by insertion and deletion.
//!
//! A node has no record of its own. It is the chain of entry edges reachable
//! from its leading anchor, so a [`Node`] is only that anchor id and every
//! question about it (length, leafness, parent, children) is answered by
//! walking the store. Nothing is cached between calls.

use std::cmp::Ordering;

use crate::compare::KeyComparator;
use crate::error::{StoreResult, TreeError, TreeResult};
use crate::store::RecordStore;
use crate::types::{AnchorId, EntryId, NodeSearch, Relation};

/// Stateless view of one node, identified by its leading anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Node {
    leading: AnchorId,
}

/// Anchors and entries of one node in chain order.
///
/// `entries[i]` runs from `anchors[i]` to `anchors[i + 1]`, so there is
/// always exactly one more anchor than there are entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) anchors: Vec<AnchorId>,
    pub(crate) entries: Vec<EntryId>,
}

impl Layout {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn trailing(&self) -> AnchorId {
        self.anchors[self.anchors.len() - 1]
    }

    /// Position of the anchor `child` hangs off.
    pub(crate) fn child_index<S: RecordStore>(&self, store: &S, child: Node) -> TreeResult<usize> {
        for (index, anchor) in self.anchors.iter().enumerate() {
            if store.relation(Relation::Subtree, *anchor)? == Some(child.leading) {
                return Ok(index);
            }
        }
        Err(TreeError::inconsistency(
            "Parent link inconsistency",
            &format!(
                "node {} is not a child of node {}",
                child.leading, self.anchors[0]
            ),
        ))
    }
}

impl Node {
    pub(crate) fn new(leading: AnchorId) -> Self {
        Self { leading }
    }

    pub(crate) fn leading(self) -> AnchorId {
        self.leading
    }

    /// Walk the entry chain from the leading anchor.
    pub(crate) fn layout<S: RecordStore>(self, store: &S) -> StoreResult<Layout> {
        let mut anchors = vec![self.leading];
        let mut entries = Vec::new();
        let mut anchor = self.leading;
        while let Some(entry) = store.outgoing(anchor)? {
            entries.push(entry);
            anchor = store.entry(entry)?.end;
            anchors.push(anchor);
        }
        Ok(Layout { anchors, entries })
    }

    /// Number of entries in the chain.
    pub(crate) fn len<S: RecordStore>(self, store: &S) -> StoreResult<usize> {
        let mut count = 0;
        let mut anchor = self.leading;
        while let Some(entry) = store.outgoing(anchor)? {
            count += 1;
            anchor = store.entry(entry)?.end;
        }
        Ok(count)
    }

    /// A node is a leaf iff its leading anchor carries no subtree; the
    /// validator checks that every other anchor agrees.
    pub(crate) fn is_leaf<S: RecordStore>(self, store: &S) -> StoreResult<bool> {
        Ok(store.relation(Relation::Subtree, self.leading)?.is_none())
    }

    pub(crate) fn parent<S: RecordStore>(self, store: &S) -> StoreResult<Option<Node>> {
        Ok(store
            .relation(Relation::Parent, self.leading)?
            .map(Node::new))
    }

    /// Scan the chain for `key`: either the entry holding it, or the anchor
    /// of the gap it falls into.
    pub(crate) fn search<S, C>(self, store: &S, comparator: &C, key: &S::Key) -> StoreResult<NodeSearch>
    where
        S: RecordStore,
        C: KeyComparator<S::Key>,
    {
        let mut anchor = self.leading;
        while let Some(entry) = store.outgoing(anchor)? {
            let record = store.entry(entry)?;
            match comparator.compare(key, &record.key) {
                Ordering::Equal => return Ok(NodeSearch::Found(entry)),
                Ordering::Less => return Ok(NodeSearch::Gap(anchor)),
                Ordering::Greater => anchor = record.end,
            }
        }
        Ok(NodeSearch::Gap(anchor))
    }
}

/// Child node hanging off `anchor`, if any.
pub(crate) fn subtree<S: RecordStore>(store: &S, anchor: AnchorId) -> StoreResult<Option<Node>> {
    Ok(store.relation(Relation::Subtree, anchor)?.map(Node::new))
}

/// Make room for a new entry right after `at`.
///
/// Creates a fresh anchor and re-anchors the entry that started at `at` so
/// it starts there instead. Afterwards `at` has a free outgoing slot and the
/// returned anchor a free incoming slot.
pub(crate) fn open_gap<S: RecordStore>(store: &mut S, at: AnchorId) -> StoreResult<AnchorId> {
    let fresh = store.create_anchor()?;
    if let Some(next) = store.outgoing(at)? {
        let end = store.entry(next)?.end;
        store.move_entry(next, fresh, end)?;
    }
    Ok(fresh)
}

/// Inverse of [`open_gap`]: fold the empty span between `at` and `vacated`
/// back into one anchor and delete `vacated`.
///
/// The caller must already have removed the edge between the two and moved
/// away any subtree hanging off `vacated`.
pub(crate) fn close_gap<S: RecordStore>(
    store: &mut S,
    at: AnchorId,
    vacated: AnchorId,
) -> StoreResult<()> {
    if let Some(next) = store.outgoing(vacated)? {
        let end = store.entry(next)?.end;
        store.move_entry(next, at, end)?;
    }
    store.delete_anchor(vacated)
}

/// Hang `child` off `anchor`, which belongs to `parent`.
pub(crate) fn attach_child<S: RecordStore>(
    store: &mut S,
    anchor: AnchorId,
    child: Node,
    parent: Node,
) -> StoreResult<()> {
    store.create_relation(Relation::Subtree, anchor, child.leading)?;
    store.create_relation(Relation::Parent, child.leading, parent.leading)
}

/// Move whatever subtree hangs off `from` so it hangs off `to`.
pub(crate) fn move_subtree<S: RecordStore>(
    store: &mut S,
    from: AnchorId,
    to: AnchorId,
) -> StoreResult<Option<Node>> {
    match store.delete_relation(Relation::Subtree, from)? {
        Some(child) => {
            store.create_relation(Relation::Subtree, to, child)?;
            Ok(Some(Node::new(child)))
        }
        None => Ok(None),
    }
}

/// Point the parent link of `child` at `parent`.
pub(crate) fn adopt<S: RecordStore>(store: &mut S, child: Node, parent: Node) -> StoreResult<()> {
    store.delete_relation(Relation::Parent, child.leading)?;
    store.create_relation(Relation::Parent, child.leading, parent.leading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use crate::store::MemoryStore;

    type Store = MemoryStore<u32, char>;

    /// Build a single node holding `keys` and return its view.
    fn chain(store: &mut Store, keys: &[u32]) -> Node {
        let leading = store.create_anchor().unwrap();
        let mut anchor = leading;
        for key in keys {
            let next = store.create_anchor().unwrap();
            store.create_entry(anchor, next, *key, 'x').unwrap();
            anchor = next;
        }
        Node::new(leading)
    }

    fn keys(store: &Store, node: Node) -> Vec<u32> {
        node.layout(store)
            .unwrap()
            .entries
            .iter()
            .map(|entry| store.entry(*entry).unwrap().key)
            .collect()
    }

    #[test]
    fn test_layout_walks_chain() {
        let mut store = Store::new();
        let node = chain(&mut store, &[1, 3, 5]);

        let layout = node.layout(&store).unwrap();
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.anchors.len(), 4);
        assert_eq!(layout.anchors[0], node.leading());
        assert_eq!(node.len(&store).unwrap(), 3);
        assert!(node.is_leaf(&store).unwrap());
        assert_eq!(node.parent(&store).unwrap(), None);
    }

    #[test]
    fn test_search_reports_hits_and_gaps() {
        let mut store = Store::new();
        let node = chain(&mut store, &[10, 20, 30]);
        let layout = node.layout(&store).unwrap();

        assert_eq!(
            node.search(&store, &NaturalOrder, &20).unwrap(),
            NodeSearch::Found(layout.entries[1])
        );
        assert_eq!(
            node.search(&store, &NaturalOrder, &5).unwrap(),
            NodeSearch::Gap(layout.anchors[0])
        );
        assert_eq!(
            node.search(&store, &NaturalOrder, &25).unwrap(),
            NodeSearch::Gap(layout.anchors[2])
        );
        assert_eq!(
            node.search(&store, &NaturalOrder, &99).unwrap(),
            NodeSearch::Gap(layout.trailing())
        );
    }

    #[test]
    fn test_open_and_close_gap() {
        let mut store = Store::new();
        let node = chain(&mut store, &[10, 30]);
        let gap = node.layout(&store).unwrap().anchors[1];

        let fresh = open_gap(&mut store, gap).unwrap();
        store.create_entry(gap, fresh, 20, 'y').unwrap();
        assert_eq!(keys(&store, node), vec![10, 20, 30]);

        let middle = store.outgoing(gap).unwrap().unwrap();
        store.delete_entry(middle).unwrap();
        close_gap(&mut store, gap, fresh).unwrap();
        assert_eq!(keys(&store, node), vec![10, 30]);
        assert_eq!(store.stats().anchors, 3);
    }

    #[test]
    fn test_children_and_parents() {
        let mut store = Store::new();
        let parent = chain(&mut store, &[50]);
        let left = chain(&mut store, &[10, 20]);
        let right = chain(&mut store, &[60]);
        let layout = parent.layout(&store).unwrap();

        attach_child(&mut store, layout.anchors[0], left, parent).unwrap();
        attach_child(&mut store, layout.anchors[1], right, parent).unwrap();

        assert!(!parent.is_leaf(&store).unwrap());
        assert_eq!(left.parent(&store).unwrap(), Some(parent));
        assert_eq!(subtree(&store, layout.anchors[1]).unwrap(), Some(right));
        assert_eq!(layout.child_index(&store, right).unwrap(), 1);

        let spare = store.create_anchor().unwrap();
        assert_eq!(move_subtree(&mut store, layout.anchors[1], spare).unwrap(), Some(right));
        assert!(layout.child_index(&store, right).is_err());

        adopt(&mut store, right, left).unwrap();
        assert_eq!(right.parent(&store).unwrap(), Some(left));
    }
}
