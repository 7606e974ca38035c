//! Client-side session and data core for the shopdesk retail dashboard.
//!
//! - `api`: HTTP client adapter with progress signalling and default headers
//! - `auth`: the session store (restore, login, logout, admin check)
//! - `monitor`: inactivity and absolute-expiration enforcement
//! - `cache`: read-through fallback for list views
//! - `storage`: durable key-value storage behind the two above
//! - `config`: user configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod monitor;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, ApiError, ProgressIndicator, RequestCounter, Resource};
pub use auth::{LogoutReason, SessionState, SessionStore, User};
pub use cache::{ListCache, ListLoad, ListSource};
pub use config::Config;
pub use monitor::{ActivityKind, InactivityMonitor, MonitorSettings};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
