//! Durable key-value storage for session credentials and cached lists.
//!
//! This module provides:
//! - `KeyValueStore`: the narrow get/set/remove interface every owner uses
//! - `FileStore`: one file per key under the storage directory
//! - `MemoryStore`: an in-process map for ephemeral sessions and tests
//!
//! Key families have a single owner each: the session store writes
//! `token`, `user` and `expirationTime`; the list cache writes `*_cache`.

pub mod error;
pub mod store;

pub use error::StorageError;
pub use store::{FileStore, KeyValueStore, MemoryStore};
