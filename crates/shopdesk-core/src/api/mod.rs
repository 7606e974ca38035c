//! REST API client module for the shopdesk dashboard backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! dashboard API (auth endpoints plus resource listings and mutations),
//! and the `ProgressIndicator` it reports every call to.
//!
//! Requests are authenticated with a bearer token the session store
//! installs as a process-wide default header.

pub mod client;
pub mod error;
pub mod progress;
pub mod resource;

pub use client::{AccountResponse, ApiClient, AuthResponse, NewAccount};
pub use error::ApiError;
pub use progress::{ProgressIndicator, RequestCounter};
pub use resource::Resource;
