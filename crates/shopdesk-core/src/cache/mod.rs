//! Read-through cache for list views.
//!
//! This module provides the `ListCache` for keeping the last successfully
//! fetched copy of each list resource (products, sales, ...). It is read
//! only when a live fetch fails; entries never expire and survive restarts
//! when backed by a `FileStore`.

pub mod manager;

pub use manager::{CachedData, ListCache, ListLoad, ListSource};
