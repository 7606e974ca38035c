//! Inactivity and expiration enforcement for the signed-in session.
//!
//! `InactivityMonitor` combines an `IdleTimer` that is reset by tracked
//! user activity with a periodic check of the session's absolute
//! expiration. Either one ends the session through `SessionGuard`.

pub mod activity;
pub mod inactivity;
pub mod timer;

pub use activity::ActivityKind;
pub use inactivity::{InactivityMonitor, MonitorSettings, SessionGuard};
pub use timer::IdleTimer;
