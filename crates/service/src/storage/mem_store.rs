use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::debug;

use super::transaction::{Expect, Staged, Transaction};
use super::{Record, StoreError, StoreResult};

/// Immutable committed state of a [`MemStore`].
pub struct Snapshot<R: Record> {
    version: u64,
    rows: BTreeMap<R::Key, Arc<R>>,
}

impl<R: Record> Snapshot<R> {
    fn empty() -> Self {
        Self { version: 0, rows: BTreeMap::new() }
    }

    /// Number of commits that produced this snapshot.
    pub fn version(&self) -> u64 { self.version }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get<Q>(&self, key: &Q) -> Option<&Arc<R>>
    where
        R::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rows.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        R::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rows.contains_key(key)
    }

    pub(crate) fn rows(&self) -> &BTreeMap<R::Key, Arc<R>> { &self.rows }
}

/// Single-table in-memory store keyed by [`Record::key`].
///
/// Shared through `Arc`; each instance is independent, so tests can build
/// as many isolated stores as they like.
pub struct MemStore<R: Record> {
    current: ArcSwap<Snapshot<R>>,
    commit_lock: Mutex<()>,
}

impl<R: Record> Default for MemStore<R> {
    fn default() -> Self { Self::new() }
}

impl<R: Record> MemStore<R> {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            commit_lock: Mutex::new(()),
        }
    }

    /// Start a transaction pinned to the latest committed snapshot.
    pub fn begin(&self, writable: bool) -> Transaction<'_, R> {
        Transaction::new(self, self.current.load_full(), writable)
    }

    /// Latest committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot<R>> { self.current.load_full() }

    pub fn version(&self) -> u64 { self.current.load().version }

    pub fn len(&self) -> usize { self.current.load().len() }

    pub fn is_empty(&self) -> bool { self.current.load().is_empty() }

    /// Validate `writes` against the latest snapshot and publish the result.
    /// Returns the new version; nothing is published on error.
    pub(crate) fn publish(&self, writes: &BTreeMap<R::Key, Staged<R>>) -> StoreResult<u64> {
        let _guard = self.commit_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let latest = self.current.load_full();

        for (key, staged) in writes {
            let present = latest.contains(key);
            match staged.expect {
                Expect::Absent if present => {
                    debug!(%key, version = latest.version, "commit conflict: key appeared");
                    return Err(StoreError::KeyExists(key.to_string()));
                }
                Expect::Present if !present => {
                    debug!(%key, version = latest.version, "commit conflict: key vanished");
                    return Err(StoreError::KeyMissing(key.to_string()));
                }
                _ => {}
            }
        }

        let mut rows = latest.rows.clone();
        for (key, staged) in writes {
            match &staged.value {
                Some(record) => {
                    rows.insert(key.clone(), Arc::clone(record));
                }
                None => {
                    rows.remove(key);
                }
            }
        }

        let version = latest.version + 1;
        self.current.store(Arc::new(Snapshot { version, rows }));
        debug!(version, staged = writes.len(), "committed");
        Ok(version)
    }
}
