use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

type ExpireCallback = Arc<dyn Fn() + Send + Sync>;

/// A single resettable deadline.
///
/// `reset()` cancels the pending deadline and schedules a new one `limit`
/// from now; when a deadline passes without a reset, `on_expire` runs once.
/// Must be used from within a tokio runtime.
pub struct IdleTimer {
    limit: Duration,
    on_expire: ExpireCallback,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl IdleTimer {
    pub fn new(limit: Duration, on_expire: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            limit,
            on_expire: Arc::new(on_expire),
            pending: Mutex::new(None),
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn reset(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let limit = self.limit;
        let on_expire = self.on_expire.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            on_expire();
        }));
    }

    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// True while a deadline is scheduled and has not fired.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer(limit: Duration) -> (IdleTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = IdleTimer::new(limit, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (timer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_limit() {
        let (timer, fired) = counting_timer(Duration::from_secs(60));
        timer.reset();
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_supersedes_pending_deadline() {
        let (timer, fired) = counting_timer(Duration::from_secs(60));
        timer.reset();
        tokio::time::sleep(Duration::from_secs(45)).await;
        timer.reset();
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry() {
        let (timer, fired) = counting_timer(Duration::from_secs(60));
        timer.reset();
        timer.cancel();
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (timer, fired) = counting_timer(Duration::from_secs(60));
        timer.reset();
        drop(timer);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
