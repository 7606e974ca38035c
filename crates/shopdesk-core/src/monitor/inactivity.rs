use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::auth::{LogoutReason, SessionStore};

use super::{ActivityKind, IdleTimer};

/// Idle period after which the session is ended.
pub const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(30 * 60);

/// How often the absolute session expiration is checked.
pub const DEFAULT_EXPIRATION_POLL: Duration = Duration::from_secs(10);

/// What the monitor needs from the session it guards.
pub trait SessionGuard: Send + Sync + 'static {
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// End the session. Must tolerate being called when already ended.
    fn force_logout(&self, reason: LogoutReason);
}

impl SessionGuard for SessionStore {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        SessionStore::expires_at(self)
    }

    fn force_logout(&self, reason: LogoutReason) {
        self.end_session(reason);
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub idle_limit: Duration,
    pub poll_interval: Duration,
    pub tracked: Vec<ActivityKind>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            idle_limit: DEFAULT_IDLE_LIMIT,
            poll_interval: DEFAULT_EXPIRATION_POLL,
            tracked: ActivityKind::default_tracked(),
        }
    }
}

/// Ends the session after a period without tracked activity, and as soon
/// as its absolute expiration has passed.
///
/// Both timers stop on `shutdown()` or when the monitor is dropped.
pub struct InactivityMonitor {
    idle: IdleTimer,
    expiration_poll: JoinHandle<()>,
    tracked: HashSet<ActivityKind>,
}

impl InactivityMonitor {
    /// Start both timers. Must be called from within a tokio runtime.
    pub fn start<G: SessionGuard>(guard: Arc<G>, settings: MonitorSettings) -> Self {
        let idle_guard = guard.clone();
        let idle = IdleTimer::new(settings.idle_limit, move || {
            info!("No activity within idle limit, ending session");
            idle_guard.force_logout(LogoutReason::Idle);
        });
        idle.reset();

        let expiration_poll = tokio::spawn(Self::poll_expiration(guard, settings.poll_interval));

        debug!(
            idle_limit_secs = settings.idle_limit.as_secs(),
            poll_secs = settings.poll_interval.as_secs(),
            tracked = settings.tracked.len(),
            "Inactivity monitor started"
        );

        Self {
            idle,
            expiration_poll,
            tracked: settings.tracked.into_iter().collect(),
        }
    }

    async fn poll_expiration<G: SessionGuard>(guard: Arc<G>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(expires_at) = guard.expires_at() {
                if Utc::now() >= expires_at {
                    info!(%expires_at, "Session expired, ending session");
                    guard.force_logout(LogoutReason::Expired);
                }
            }
        }
    }

    /// Report a user interaction. Returns false for untracked kinds, which
    /// leave the idle countdown untouched.
    pub fn record_activity(&self, kind: ActivityKind) -> bool {
        if !self.tracked.contains(&kind) {
            return false;
        }
        self.idle.reset();
        true
    }

    pub fn is_tracked(&self, kind: ActivityKind) -> bool {
        self.tracked.contains(&kind)
    }

    pub fn shutdown(&self) {
        self.idle.cancel();
        self.expiration_poll.abort();
        debug!("Inactivity monitor stopped");
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
