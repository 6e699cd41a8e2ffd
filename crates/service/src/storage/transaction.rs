use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap};
use std::iter::Peekable;
use std::sync::Arc;

use tracing::trace;

use super::mem_store::{MemStore, Snapshot};
use super::{Record, StoreError, StoreResult};

/// What the transaction saw for a key before its first write to it.
/// Checked again against the latest snapshot at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    Absent,
    Present,
}

#[derive(Debug)]
pub(crate) struct Staged<R> {
    pub(crate) expect: Expect,
    /// `None` stages a removal.
    pub(crate) value: Option<Arc<R>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Open,
    Committed,
    Aborted,
}

/// A unit of reads and staged writes over one pinned [`Snapshot`].
///
/// Writes are private to the transaction until [`commit`](Self::commit).
/// Dropping an open transaction discards its writes.
pub struct Transaction<'s, R: Record> {
    store: &'s MemStore<R>,
    snapshot: Arc<Snapshot<R>>,
    writes: BTreeMap<R::Key, Staged<R>>,
    writable: bool,
    state: TxnState,
}

impl<'s, R: Record> Transaction<'s, R> {
    pub(crate) fn new(store: &'s MemStore<R>, snapshot: Arc<Snapshot<R>>, writable: bool) -> Self {
        Self { store, snapshot, writes: BTreeMap::new(), writable, state: TxnState::Open }
    }

    pub fn is_writable(&self) -> bool { self.writable }

    pub fn is_open(&self) -> bool { self.state == TxnState::Open }

    /// Version of the snapshot this transaction reads from.
    pub fn snapshot_version(&self) -> u64 { self.snapshot.version() }

    /// Point lookup through staged writes, then the pinned snapshot.
    pub fn lookup<Q>(&self, key: &Q) -> StoreResult<Option<Arc<R>>>
    where
        R::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.ensure_open()?;
        let found = match self.writes.get(key) {
            Some(staged) => staged.value.clone(),
            None => self.snapshot.get(key).cloned(),
        };
        Ok(found)
    }

    /// Lazy key-ordered iteration over everything visible to this transaction.
    pub fn scan(&self) -> StoreResult<Scan<'_, R>> {
        self.ensure_open()?;
        Ok(Scan {
            base: self.snapshot.rows().iter().peekable(),
            staged: self.writes.iter().peekable(),
        })
    }

    /// Stage a new record. Fails if its key is already visible.
    pub fn insert(&mut self, record: R) -> StoreResult<()> {
        self.ensure_writable()?;
        let key = record.key();
        if self.visible(&key) {
            return Err(StoreError::KeyExists(key.to_string()));
        }
        let value = Some(Arc::new(record));
        match self.writes.entry(key) {
            btree_map::Entry::Occupied(mut e) => e.get_mut().value = value,
            btree_map::Entry::Vacant(e) => {
                e.insert(Staged { expect: Expect::Absent, value });
            }
        }
        Ok(())
    }

    /// Stage removal of `key`. Fails if it is not visible.
    pub fn delete(&mut self, key: R::Key) -> StoreResult<()> {
        self.ensure_writable()?;
        if !self.visible(&key) {
            return Err(StoreError::KeyMissing(key.to_string()));
        }
        match self.writes.entry(key) {
            btree_map::Entry::Occupied(mut e) => e.get_mut().value = None,
            btree_map::Entry::Vacant(e) => {
                e.insert(Staged { expect: Expect::Present, value: None });
            }
        }
        Ok(())
    }

    /// Replace an existing record wholesale: delete followed by insert.
    pub fn replace(&mut self, record: R) -> StoreResult<()> {
        self.delete(record.key())?;
        self.insert(record)
    }

    /// Publish staged writes atomically. The transaction is closed afterwards,
    /// whether or not the commit succeeded.
    pub fn commit(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        if !self.writable || self.writes.is_empty() {
            self.state = TxnState::Committed;
            return Ok(());
        }
        let writes = std::mem::take(&mut self.writes);
        match self.store.publish(&writes) {
            Ok(version) => {
                self.state = TxnState::Committed;
                trace!(version, from = self.snapshot.version(), "transaction committed");
                Ok(())
            }
            Err(e) => {
                self.state = TxnState::Aborted;
                Err(e)
            }
        }
    }

    /// Discard staged writes. No-op once the transaction is closed.
    pub fn abort(&mut self) {
        if self.state == TxnState::Open {
            self.writes.clear();
            self.state = TxnState::Aborted;
        }
    }

    fn visible(&self, key: &R::Key) -> bool {
        match self.writes.get(key) {
            Some(staged) => staged.value.is_some(),
            None => self.snapshot.contains(key),
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.state != TxnState::Open {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        self.ensure_open()?;
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

/// Merge of the pinned snapshot and the staged writes, ordered by key.
/// Single pass; call [`Transaction::scan`] again to restart.
pub struct Scan<'t, R: Record> {
    base: Peekable<btree_map::Iter<'t, R::Key, Arc<R>>>,
    staged: Peekable<btree_map::Iter<'t, R::Key, Staged<R>>>,
}

impl<'t, R: Record> Iterator for Scan<'t, R> {
    type Item = Arc<R>;

    fn next(&mut self) -> Option<Arc<R>> {
        loop {
            let order = match (self.base.peek(), self.staged.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((base_key, _)), Some((staged_key, _))) => base_key.cmp(staged_key),
            };
            if order == Ordering::Less {
                return self.base.next().map(|(_, record)| Arc::clone(record));
            }
            if order == Ordering::Equal {
                // shadowed by the staged write
                self.base.next();
            }
            let (_, staged) = self.staged.next()?;
            if let Some(record) = &staged.value {
                return Some(Arc::clone(record));
            }
        }
    }
}
