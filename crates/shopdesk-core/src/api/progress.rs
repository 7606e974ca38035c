use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives a start/finish pair around every outbound API call.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self);
    fn finish(&self);
}

/// Counts requests; `in_flight() > 0` means "loading".
#[derive(Debug, Default)]
pub struct RequestCounter {
    in_flight: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl ProgressIndicator for RequestCounter {
    fn start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        // Saturate rather than wrap if an indicator is shared with other callers
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Signals `start` on creation and `finish` exactly once on drop, so the
/// indicator is released on every exit path of a request.
pub(crate) struct ProgressGuard {
    indicator: Arc<dyn ProgressIndicator>,
}

impl ProgressGuard {
    pub(crate) fn begin(indicator: Arc<dyn ProgressIndicator>) -> Self {
        indicator.start();
        Self { indicator }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.indicator.finish();
    }
}
