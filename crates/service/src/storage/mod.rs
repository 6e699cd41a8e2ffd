//! In-memory record store with snapshot reads and commit-time validation.
//!
//! - Committed state is an immutable [`Snapshot`] swapped atomically on commit.
//! - Readers pin a snapshot and never take a lock.
//! - Writers stage changes locally; [`Transaction::commit`] re-checks every
//!   staged precondition against the latest snapshot under a single commit lock.

use std::fmt::Display;

use thiserror::Error;

pub mod mem_store;
pub mod transaction;

pub use mem_store::{MemStore, Snapshot};
pub use transaction::{Scan, Transaction};

/// A value that can live in a [`MemStore`]. The key is the unique index.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Ord + Clone + Display + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key already exists: {0}")]
    KeyExists(String),
    #[error("key not found: {0}")]
    KeyMissing(String),
    #[error("transaction is read-only")]
    ReadOnly,
    #[error("transaction is closed")]
    Closed,
    #[error("commit lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
