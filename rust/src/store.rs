//! Record store: the substrate anchors and entry edges live in.
//!
//! The tree never holds records itself. It asks a [`RecordStore`] to create
//! and delete anchors, to create, move and delete the entry edges between
//! them, to wire anchors together with relations, and to open and commit
//! transactions. [`MemoryStore`] is the in-memory implementation over two
//! arenas; other backends (a graph database, a key-value store) can implement
//! the same trait and keep the algorithm unchanged.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::arena::Arena;
use crate::error::{StoreError, StoreResult};
use crate::types::{AnchorId, AnchorRecord, EntryId, EntryRecord, Relation, StoreStats};

/// Primitive operations the tree needs from its storage substrate.
///
/// Edge and relation slots are exclusive: an anchor has at most one outgoing
/// and one incoming entry edge, and at most one outgoing relation per
/// [`Relation`] kind. Attempts to occupy a taken slot fail instead of
/// overwriting it.
pub trait RecordStore {
    type Key;
    type Payload;

    /// Create a fresh anchor with no edges and no relations.
    fn create_anchor(&mut self) -> StoreResult<AnchorId>;

    /// Delete an anchor. Fails with `AnchorInUse` while any edge or
    /// outgoing relation is still attached to it.
    fn delete_anchor(&mut self, anchor: AnchorId) -> StoreResult<()>;

    /// Create an entry edge from `start` to `end` holding `key` and `payload`.
    fn create_entry(
        &mut self,
        start: AnchorId,
        end: AnchorId,
        key: Self::Key,
        payload: Self::Payload,
    ) -> StoreResult<EntryId>;

    /// Delete an entry edge, returning its key and payload.
    fn delete_entry(&mut self, entry: EntryId) -> StoreResult<(Self::Key, Self::Payload)>;

    /// Re-anchor an existing entry edge between two other anchors, keeping
    /// its key and payload.
    fn move_entry(&mut self, entry: EntryId, start: AnchorId, end: AnchorId) -> StoreResult<()>;

    fn entry(&self, entry: EntryId) -> StoreResult<&EntryRecord<Self::Key, Self::Payload>>;

    fn entry_mut(
        &mut self,
        entry: EntryId,
    ) -> StoreResult<&mut EntryRecord<Self::Key, Self::Payload>>;

    /// Entry edge starting at `anchor`, if any.
    fn outgoing(&self, anchor: AnchorId) -> StoreResult<Option<EntryId>>;

    /// Entry edge ending at `anchor`, if any.
    fn incoming(&self, anchor: AnchorId) -> StoreResult<Option<EntryId>>;

    /// Target of the `kind` relation leaving `from`, if any.
    fn relation(&self, kind: Relation, from: AnchorId) -> StoreResult<Option<AnchorId>>;

    fn create_relation(&mut self, kind: Relation, from: AnchorId, to: AnchorId) -> StoreResult<()>;

    /// Remove the `kind` relation leaving `from`, returning its old target.
    fn delete_relation(&mut self, kind: Relation, from: AnchorId) -> StoreResult<Option<AnchorId>>;

    fn begin_transaction(&mut self) -> StoreResult<()>;

    /// Make the open transaction's writes durable. A refused commit closes
    /// the transaction and discards its writes.
    fn commit(&mut self) -> StoreResult<()>;

    /// End the open transaction and discard its writes.
    fn abort(&mut self) -> StoreResult<()>;

    fn in_transaction(&self) -> bool;

    fn stats(&self) -> StoreStats;
}

// ============================================================================
// TRANSACTION SCOPE
// ============================================================================

/// An open store transaction that aborts when dropped while still open.
///
/// Dropping covers every exit that skips [`commit`](Transaction::commit):
/// early returns, `?` and unwinding out of a panicking comparator.
pub(crate) struct Transaction<'s, S: RecordStore> {
    store: &'s mut S,
}

impl<'s, S: RecordStore> Transaction<'s, S> {
    pub(crate) fn begin(store: &'s mut S) -> StoreResult<Self> {
        store.begin_transaction()?;
        Ok(Self { store })
    }

    pub(crate) fn commit(mut self) -> StoreResult<()> {
        self.store.commit()
    }

    pub(crate) fn abort(mut self) -> StoreResult<()> {
        self.store.abort()
    }
}

impl<S: RecordStore> Deref for Transaction<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.store
    }
}

impl<S: RecordStore> DerefMut for Transaction<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.store
    }
}

impl<S: RecordStore> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if self.store.in_transaction() {
            if let Err(err) = self.store.abort() {
                debug!(error = %err, "abort on drop failed");
            }
        }
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Slot contents as they were before one write.
#[derive(Debug, Clone)]
enum Undo<K, P> {
    Anchor(u32, Option<AnchorRecord>),
    Entry(u32, Option<EntryRecord<K, P>>),
}

/// In-memory record store over two arenas.
///
/// Writes land in the arenas immediately. Inside a transaction every slot
/// write is journaled first, and `abort` (or a refused commit) replays the
/// journal backwards. Commits can be made to fail on demand with
/// [`fail_commits_after`](MemoryStore::fail_commits_after).
#[derive(Debug, Clone)]
pub struct MemoryStore<K, P> {
    anchors: Arena<AnchorRecord>,
    entries: Arena<EntryRecord<K, P>>,
    in_transaction: bool,
    undo: Vec<Undo<K, P>>,
    commits: u64,
    /// Number of further commits allowed to succeed.
    commit_budget: Option<u64>,
}

impl<K, P> MemoryStore<K, P> {
    pub fn new() -> Self {
        Self {
            anchors: Arena::new(),
            entries: Arena::new(),
            in_transaction: false,
            undo: Vec::new(),
            commits: 0,
            commit_budget: None,
        }
    }

    /// Let `successes` more commits through, then refuse every later one
    /// with a transaction failure.
    pub fn fail_commits_after(&mut self, successes: u64) {
        self.commit_budget = Some(successes);
    }

    /// Remove any commit failure injected earlier.
    pub fn clear_commit_failures(&mut self) {
        self.commit_budget = None;
    }

    fn anchor(&self, anchor: AnchorId) -> StoreResult<&AnchorRecord> {
        self.anchors
            .get(anchor.0)
            .ok_or(StoreError::MissingAnchor(anchor))
    }

    /// Replay the journal backwards and empty it.
    fn roll_back(&mut self) -> usize {
        let undone = self.undo.len();
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Anchor(id, before) => self.anchors.restore(id, before),
                Undo::Entry(id, before) => self.entries.restore(id, before),
            }
        }
        undone
    }
}

impl<K: Clone, P: Clone> MemoryStore<K, P> {
    fn save_anchor(&mut self, id: u32) {
        if self.in_transaction {
            let before = self.anchors.get(id).cloned();
            self.undo.push(Undo::Anchor(id, before));
        }
    }

    fn save_entry(&mut self, id: u32) {
        if self.in_transaction {
            let before = self.entries.get(id).cloned();
            self.undo.push(Undo::Entry(id, before));
        }
    }

    fn anchor_mut(&mut self, anchor: AnchorId) -> StoreResult<&mut AnchorRecord> {
        self.anchor(anchor)?;
        self.save_anchor(anchor.0);
        self.anchors
            .get_mut(anchor.0)
            .ok_or(StoreError::MissingAnchor(anchor))
    }

    /// Claim the outgoing slot of `start` and the incoming slot of `end`.
    fn attach(&mut self, entry: EntryId, start: AnchorId, end: AnchorId) -> StoreResult<()> {
        if let Some(existing) = self.anchor(start)?.outgoing {
            return Err(StoreError::EdgeConflict {
                anchor: start,
                side: "outgoing",
                existing,
            });
        }
        if let Some(existing) = self.anchor(end)?.incoming {
            return Err(StoreError::EdgeConflict {
                anchor: end,
                side: "incoming",
                existing,
            });
        }
        self.anchor_mut(start)?.outgoing = Some(entry);
        self.anchor_mut(end)?.incoming = Some(entry);
        Ok(())
    }

    /// Release whichever anchor slots still point at `entry`.
    fn detach(&mut self, entry: EntryId, start: AnchorId, end: AnchorId) -> StoreResult<()> {
        let start_record = self.anchor_mut(start)?;
        if start_record.outgoing == Some(entry) {
            start_record.outgoing = None;
        }
        let end_record = self.anchor_mut(end)?;
        if end_record.incoming == Some(entry) {
            end_record.incoming = None;
        }
        Ok(())
    }
}

impl<K, P> Default for MemoryStore<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, P: Clone> RecordStore for MemoryStore<K, P> {
    type Key = K;
    type Payload = P;

    fn create_anchor(&mut self) -> StoreResult<AnchorId> {
        let id = self
            .anchors
            .allocate(AnchorRecord::default())
            .ok_or_else(|| StoreError::transaction_failure("create anchor", "id space exhausted"))?;
        if self.in_transaction {
            self.undo.push(Undo::Anchor(id, None));
        }
        Ok(AnchorId(id))
    }

    fn delete_anchor(&mut self, anchor: AnchorId) -> StoreResult<()> {
        if !self.anchor(anchor)?.is_detached() {
            return Err(StoreError::AnchorInUse(anchor));
        }
        self.save_anchor(anchor.0);
        self.anchors.deallocate(anchor.0);
        Ok(())
    }

    fn create_entry(
        &mut self,
        start: AnchorId,
        end: AnchorId,
        key: K,
        payload: P,
    ) -> StoreResult<EntryId> {
        // Both anchors must exist before the edge is allocated.
        self.anchor(start)?;
        self.anchor(end)?;
        let id = self
            .entries
            .allocate(EntryRecord {
                key,
                payload,
                start,
                end,
            })
            .map(EntryId)
            .ok_or_else(|| StoreError::transaction_failure("create entry", "id space exhausted"))?;
        if self.in_transaction {
            self.undo.push(Undo::Entry(id.0, None));
        }
        if let Err(err) = self.attach(id, start, end) {
            self.save_entry(id.0);
            self.entries.deallocate(id.0);
            return Err(err);
        }
        Ok(id)
    }

    fn delete_entry(&mut self, entry: EntryId) -> StoreResult<(K, P)> {
        let (start, end) = {
            let record = self.entry(entry)?;
            (record.start, record.end)
        };
        self.detach(entry, start, end)?;
        self.save_entry(entry.0);
        let record = self
            .entries
            .deallocate(entry.0)
            .ok_or(StoreError::MissingEntry(entry))?;
        Ok((record.key, record.payload))
    }

    fn move_entry(&mut self, entry: EntryId, start: AnchorId, end: AnchorId) -> StoreResult<()> {
        let (old_start, old_end) = {
            let record = self.entry(entry)?;
            (record.start, record.end)
        };
        self.detach(entry, old_start, old_end)?;
        if let Err(err) = self.attach(entry, start, end) {
            // Leave the edge where it was.
            self.attach(entry, old_start, old_end)?;
            return Err(err);
        }
        let record = self.entry_mut(entry)?;
        record.start = start;
        record.end = end;
        Ok(())
    }

    fn entry(&self, entry: EntryId) -> StoreResult<&EntryRecord<K, P>> {
        self.entries
            .get(entry.0)
            .ok_or(StoreError::MissingEntry(entry))
    }

    fn entry_mut(&mut self, entry: EntryId) -> StoreResult<&mut EntryRecord<K, P>> {
        self.entry(entry)?;
        self.save_entry(entry.0);
        self.entries
            .get_mut(entry.0)
            .ok_or(StoreError::MissingEntry(entry))
    }

    fn outgoing(&self, anchor: AnchorId) -> StoreResult<Option<EntryId>> {
        Ok(self.anchor(anchor)?.outgoing)
    }

    fn incoming(&self, anchor: AnchorId) -> StoreResult<Option<EntryId>> {
        Ok(self.anchor(anchor)?.incoming)
    }

    fn relation(&self, kind: Relation, from: AnchorId) -> StoreResult<Option<AnchorId>> {
        Ok(self.anchor(from)?.relation(kind))
    }

    fn create_relation(&mut self, kind: Relation, from: AnchorId, to: AnchorId) -> StoreResult<()> {
        self.anchor(to)?;
        if self.anchor(from)?.relation(kind).is_some() {
            return Err(StoreError::RelationExists { kind, from });
        }
        *self.anchor_mut(from)?.relation_mut(kind) = Some(to);
        Ok(())
    }

    fn delete_relation(&mut self, kind: Relation, from: AnchorId) -> StoreResult<Option<AnchorId>> {
        Ok(self.anchor_mut(from)?.relation_mut(kind).take())
    }

    fn begin_transaction(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Err(StoreError::transaction_failure(
                "begin",
                "a transaction is already open",
            ));
        }
        self.in_transaction = true;
        self.undo.clear();
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        if self.commit_budget == Some(0) {
            let undone = self.roll_back();
            warn!(commits = self.commits, undone, "commit refused by injected failure");
            return Err(StoreError::transaction_failure("commit", "injected failure"));
        }
        if let Some(budget) = self.commit_budget.as_mut() {
            *budget -= 1;
        }
        self.undo.clear();
        self.commits += 1;
        Ok(())
    }

    fn abort(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        let undone = self.roll_back();
        debug!(undone, "transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            anchors: self.anchors.len(),
            entries: self.entries.len(),
            commits: self.commits,
        }
    }
}
