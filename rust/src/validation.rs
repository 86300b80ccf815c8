//! Validation and debugging utilities for BTree.
//!
//! This module contains the structural validator, invariant checking and
//! debugging helpers. None of it runs on the hot path; it exists so the
//! split, borrow and merge logic can be tested against the invariants.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::compare::KeyComparator;
use crate::error::{TreeError, TreeResult};
use crate::node::{subtree, Node};
use crate::store::RecordStore;
use crate::types::BTree;

// ============================================================================
// VALIDATION METHODS
// ============================================================================

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    C: KeyComparator<K>,
    K: Debug,
{
    /// Walk the whole tree and check every structural invariant.
    ///
    /// Fails on the first violation with a
    /// [`TreeError::StructuralInconsistency`] naming the check:
    /// "Key order inconsistency", "Leaf/no leaf inconsistency",
    /// "Depth key inconsistency", "Too few entries", "Too many entries",
    /// "Leaf depth inconsistency" or "Parent link inconsistency".
    pub fn validate(&self) -> TreeResult<()> {
        let store = self.store.read();
        let root = self.root_node(&store)?;
        if let Some(parent) = root.parent(&*store)? {
            return Err(TreeError::inconsistency(
                "Parent link inconsistency",
                &format!("root {} has parent {}", root.leading(), parent.leading()),
            ));
        }
        let mut leaf_depth = None;
        self.check_node(&store, root, None, None, 0, &mut leaf_depth)
    }

    /// Check if the tree maintains its invariants.
    /// Returns true if all invariants are satisfied.
    pub fn check_invariants(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check one node, then recurse into its children with the key
    /// interval each of them must stay inside.
    fn check_node<'s>(
        &self,
        store: &'s S,
        node: Node,
        lower: Option<&'s K>,
        upper: Option<&'s K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> TreeResult<()> {
        let layout = node.layout(store)?;
        let is_root = depth == 0;
        let is_leaf = node.is_leaf(store)?;

        if layout.len() > self.max_entries() {
            return Err(TreeError::inconsistency(
                "Too many entries",
                &format!(
                    "node {} holds {} (maximum {})",
                    node.leading(),
                    layout.len(),
                    self.max_entries()
                ),
            ));
        }
        let minimum = match (is_root, is_leaf) {
            (true, true) => 0,
            (true, false) => 1,
            (false, _) => self.min_entries(),
        };
        if layout.len() < minimum {
            return Err(TreeError::inconsistency(
                "Too few entries",
                &format!(
                    "node {} holds {} (minimum {})",
                    node.leading(),
                    layout.len(),
                    minimum
                ),
            ));
        }

        for anchor in &layout.anchors {
            if subtree(store, *anchor)?.is_some() == is_leaf {
                return Err(TreeError::inconsistency(
                    "Leaf/no leaf inconsistency",
                    &format!("node {} disagrees at anchor {}", node.leading(), anchor),
                ));
            }
        }

        let mut keys = Vec::with_capacity(layout.len());
        for entry in &layout.entries {
            let key = &store.entry(*entry)?.key;
            if let Some(previous) = keys.last() {
                if self.comparator.compare(*previous, key) != Ordering::Less {
                    return Err(TreeError::inconsistency(
                        "Key order inconsistency",
                        &format!("node {}: {:?} before {:?}", node.leading(), previous, key),
                    ));
                }
            }
            let below_lower =
                lower.is_some_and(|lower| self.comparator.compare(key, lower) != Ordering::Greater);
            let above_upper =
                upper.is_some_and(|upper| self.comparator.compare(key, upper) != Ordering::Less);
            if below_lower || above_upper {
                return Err(TreeError::inconsistency(
                    "Depth key inconsistency",
                    &format!(
                        "node {}: {:?} outside ({:?}, {:?})",
                        node.leading(),
                        key,
                        lower,
                        upper
                    ),
                ));
            }
            keys.push(key);
        }

        if is_leaf {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(TreeError::inconsistency(
                        "Leaf depth inconsistency",
                        &format!(
                            "leaf {} at depth {} (expected {})",
                            node.leading(),
                            depth,
                            expected
                        ),
                    ))
                }
                Some(_) => {}
            }
            return Ok(());
        }

        for (index, anchor) in layout.anchors.iter().enumerate() {
            let Some(child) = subtree(store, *anchor)? else {
                continue;
            };
            if child.parent(store)? != Some(node) {
                return Err(TreeError::inconsistency(
                    "Parent link inconsistency",
                    &format!(
                        "child {} of node {} does not point back to it",
                        child.leading(),
                        node.leading()
                    ),
                ));
            }
            let child_lower = match index {
                0 => lower,
                _ => Some(keys[index - 1]),
            };
            let child_upper = keys.get(index).copied().or(upper);
            self.check_node(store, child, child_lower, child_upper, depth + 1, leaf_depth)?;
        }
        Ok(())
    }

    // ============================================================================
    // DEBUGGING AND TESTING UTILITIES
    // ============================================================================

    /// Prints the node chain for debugging.
    pub fn print_node_chain(&self) {
        let store = self.store.read();
        match self.root_node(&store) {
            Ok(root) => {
                println!("Tree structure (order {}):", self.order);
                self.print_node(&store, root, 0);
            }
            Err(err) => println!("Tree structure: <{}>", err),
        }
    }

    fn print_node(&self, store: &S, node: Node, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(layout) = node.layout(store) else {
            println!("{}Node[{}]: <unreadable>", indent, node.leading());
            return;
        };
        let keys: Vec<&K> = layout
            .entries
            .iter()
            .filter_map(|entry| store.entry(*entry).ok().map(|record| &record.key))
            .collect();
        println!("{}Node[{}]: {:?}", indent, node.leading(), keys);
        for anchor in &layout.anchors {
            if let Ok(Some(child)) = subtree(store, *anchor) {
                self.print_node(store, child, depth + 1);
            }
        }
    }
}
