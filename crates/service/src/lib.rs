//! Service layer for the user resource.
//! - `storage`: in-memory record store with snapshot transactions.
//! - `user`: repository over the store and the validating service on top.
//! - Errors are classified per layer; nothing store-internal leaks past the repository.

pub mod errors;
pub mod storage;
pub mod user;
