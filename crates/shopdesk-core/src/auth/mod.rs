//! Authentication module for managing the signed-in identity.
//!
//! This module provides:
//! - `SessionStore`: restore/login/logout and the persisted credentials
//! - `User`: the identity record and its admin check
//!
//! Sessions are persisted through a `KeyValueStore` and carry an absolute
//! expiration that the inactivity monitor enforces.

pub mod identity;
pub mod session;

pub use identity::User;
pub use session::{LogoutReason, Session, SessionState, SessionStore};
