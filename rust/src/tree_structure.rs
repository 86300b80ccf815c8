//! Tree structure management operations for BTree.
//!
//! This module contains the tree-level plumbing every operation goes
//! through (root indirection, transaction scoping) together with size
//! queries, statistics and the batched teardown of a whole tree.

use tracing::{debug, info, warn};

use crate::compare::KeyComparator;
use crate::error::{StoreError, StoreResult, TreeError, TreeResult};
use crate::node::{subtree, Node};
use crate::payload::Payload;
use crate::store::{RecordStore, Transaction};
use crate::types::{BTree, Relation, StoreStats, TeardownReport, TreeStats};

// ============================================================================
// ROOT INDIRECTION AND TRANSACTIONS
// ============================================================================

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    C: KeyComparator<K>,
{
    /// Current root node, reached through the holder anchor.
    pub(crate) fn root_node(&self, store: &S) -> TreeResult<Node> {
        match store.relation(Relation::Root, self.holder) {
            Ok(Some(root)) => Ok(Node::new(root)),
            Ok(None) => Err(TreeError::Destroyed),
            Err(StoreError::MissingAnchor(anchor)) if anchor == self.holder => {
                Err(TreeError::Destroyed)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rewire the single root relation to `root`.
    pub(crate) fn replace_root(&self, store: &mut S, root: Node) -> StoreResult<()> {
        store.delete_relation(Relation::Root, self.holder)?;
        store.create_relation(Relation::Root, self.holder, root.leading())
    }

    /// Run `body` under the write lock inside one store transaction.
    ///
    /// Commits on success. On failure, or if `body` panics, the transaction
    /// is aborted and its writes are discarded; the original error is
    /// returned.
    pub(crate) fn mutate<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut S) -> TreeResult<T>,
    ) -> TreeResult<T> {
        let mut store = self.store.write();
        let mut txn = Transaction::begin(&mut *store)?;
        match body(&mut *txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if matches!(err, TreeError::Store(_)) {
                    warn!(operation, error = %err, "aborting transaction");
                } else {
                    debug!(operation, error = %err, "aborting transaction");
                }
                if let Err(abort_err) = txn.abort() {
                    debug!(operation, error = %abort_err, "abort failed");
                }
                Err(err)
            }
        }
    }

    /// Record counts and commit count of the underlying store.
    pub fn store_stats(&self) -> StoreStats {
        self.store.read().stats()
    }

    /// Visit every node, parents before children.
    fn for_each_node(
        &self,
        store: &S,
        mut visit: impl FnMut(Node, usize) -> TreeResult<()>,
    ) -> TreeResult<()> {
        let mut worklist = vec![(self.root_node(store)?, 0)];
        while let Some((node, depth)) = worklist.pop() {
            visit(node, depth)?;
            let layout = node.layout(store)?;
            for anchor in layout.anchors.iter().rev() {
                if let Some(child) = subtree(store, *anchor)? {
                    worklist.push((child, depth + 1));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// TREE STRUCTURE OPERATIONS
// ============================================================================

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    P: Payload,
    C: KeyComparator<K>,
    K: Clone,
{
    /// Returns the number of keys in the tree.
    pub fn len(&self) -> usize {
        self.stats().map(|stats| stats.entries).unwrap_or(0)
    }

    /// Total number of values across all payloads. Equals [`len`](Self::len)
    /// for a unique tree.
    pub fn value_count(&self) -> usize {
        self.stats().map(|stats| stats.values).unwrap_or(0)
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        let store = self.store.read();
        match self.root_node(&store) {
            Ok(root) => root.len(&*store).map(|len| len == 0).unwrap_or(true),
            Err(_) => true,
        }
    }

    /// Number of levels; a lone root counts as one.
    pub fn height(&self) -> TreeResult<usize> {
        let store = self.store.read();
        let mut node = self.root_node(&store)?;
        let mut height = 1;
        while let Some(child) = subtree(&*store, node.leading())? {
            node = child;
            height += 1;
        }
        Ok(height)
    }

    /// Structural statistics gathered by walking every node.
    pub fn stats(&self) -> TreeResult<TreeStats> {
        let store = self.store.read();
        let mut stats = TreeStats {
            anchors: store.stats().anchors,
            ..TreeStats::default()
        };
        self.for_each_node(&store, |node, depth| {
            let layout = node.layout(&*store)?;
            stats.nodes += 1;
            stats.height = stats.height.max(depth + 1);
            stats.entries += layout.len();
            for entry in &layout.entries {
                stats.values += store.entry(*entry)?.payload.len();
            }
            Ok(())
        })?;
        Ok(stats)
    }

    /// Keys of every node, grouped by level from the root down and
    /// left to right within a level.
    pub fn levels(&self) -> TreeResult<Vec<Vec<Vec<K>>>> {
        let store = self.store.read();
        let mut levels = Vec::new();
        let mut frontier = vec![self.root_node(&store)?];
        while !frontier.is_empty() {
            let mut level = Vec::with_capacity(frontier.len());
            let mut next = Vec::new();
            for node in frontier {
                let layout = node.layout(&*store)?;
                let mut keys = Vec::with_capacity(layout.len());
                for entry in &layout.entries {
                    keys.push(store.entry(*entry)?.key.clone());
                }
                level.push(keys);
                for anchor in &layout.anchors {
                    if let Some(child) = subtree(&*store, *anchor)? {
                        next.push(child);
                    }
                }
            }
            levels.push(level);
            frontier = next;
        }
        Ok(levels)
    }
}

// ============================================================================
// TEARDOWN
// ============================================================================

/// Deletion counter that commits every `batch` deletions.
struct Teardown {
    batch: usize,
    pending: usize,
    report: TeardownReport,
}

impl Teardown {
    fn new(batch: usize) -> Self {
        Self {
            batch,
            pending: 0,
            report: TeardownReport::default(),
        }
    }

    fn entry_deleted<S: RecordStore>(&mut self, store: &mut S) -> StoreResult<()> {
        self.report.entries_deleted += 1;
        self.record(store)
    }

    fn anchor_deleted<S: RecordStore>(&mut self, store: &mut S) -> StoreResult<()> {
        self.report.anchors_deleted += 1;
        self.record(store)
    }

    fn record<S: RecordStore>(&mut self, store: &mut S) -> StoreResult<()> {
        self.pending += 1;
        if self.pending == self.batch {
            store.commit()?;
            self.report.commits += 1;
            self.pending = 0;
            debug!(
                entries = self.report.entries_deleted,
                anchors = self.report.anchors_deleted,
                "teardown batch committed"
            );
            store.begin_transaction()?;
        }
        Ok(())
    }
}

impl<K, P, C, S> BTree<K, P, C, S>
where
    S: RecordStore<Key = K, Payload = P>,
    C: KeyComparator<K>,
{
    /// Delete every entry, anchor and node, then the root relation and the
    /// holder anchor.
    ///
    /// Commits after every `commit_batch_size` deletions and once at the end.
    /// This is not atomic: if a commit fails, the deletions of the failing
    /// batch are discarded but the batches committed before it stay deleted,
    /// and the tree is left permanently abandoned. After a successful
    /// teardown every operation on the tree reports [`TreeError::Destroyed`].
    pub fn destroy_all(&self, commit_batch_size: usize) -> TreeResult<TeardownReport> {
        if commit_batch_size == 0 {
            return Err(TreeError::InvalidBatchSize);
        }
        let mut store = self.store.write();
        let root = self.root_node(&store)?;
        info!(batch = commit_batch_size, "tearing down tree");

        let mut txn = Transaction::begin(&mut *store)?;
        let mut teardown = Teardown::new(commit_batch_size);
        // An error drops the guard, which discards the uncommitted batch.
        self.tear_down(&mut *txn, root, &mut teardown)?;
        txn.commit()?;
        teardown.report.commits += 1;

        info!(
            entries = teardown.report.entries_deleted,
            anchors = teardown.report.anchors_deleted,
            commits = teardown.report.commits,
            "tree torn down"
        );
        Ok(teardown.report)
    }

    fn tear_down(&self, store: &mut S, root: Node, teardown: &mut Teardown) -> TreeResult<()> {
        // Post-order: a node is deleted only after all of its children.
        let mut worklist = vec![(root, false)];
        while let Some((node, expanded)) = worklist.pop() {
            let layout = node.layout(store)?;
            if !expanded {
                worklist.push((node, true));
                for anchor in layout.anchors.iter().rev() {
                    if let Some(child) = subtree(store, *anchor)? {
                        worklist.push((child, false));
                    }
                }
                continue;
            }
            for entry in layout.entries {
                store.delete_entry(entry)?;
                teardown.entry_deleted(store)?;
            }
            for anchor in layout.anchors {
                store.delete_relation(Relation::Subtree, anchor)?;
                store.delete_relation(Relation::Parent, anchor)?;
                store.delete_anchor(anchor)?;
                teardown.anchor_deleted(store)?;
            }
        }

        store.delete_relation(Relation::Root, self.holder)?;
        store.delete_anchor(self.holder)?;
        teardown.anchor_deleted(store)?;
        Ok(())
    }
}
