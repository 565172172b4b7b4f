/// Outstanding-job counter.
///
/// A single register with two transitions. Every dispatch increments by the
/// number of jobs sent; every delivered result (success, failure or orphan)
/// decrements by one.

use tokio::sync::watch;

#[derive(Debug)]
pub struct PendingCounter {
    count: watch::Sender<usize>,
}

impl PendingCounter {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    pub fn increment(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.count.send_modify(|count| *count = count.saturating_add(n));
    }

    /// Remove up to `n` jobs. Returns how many were actually removed; a
    /// shortfall means some code path decremented without a matching send.
    pub fn decrement(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let mut removed = 0;
        self.count.send_modify(|count| {
            removed = n.min(*count);
            *count -= removed;
        });
        if removed < n {
            tracing::warn!(
                requested = n,
                removed,
                "pending-job counter would go negative, clamped at zero"
            );
        }
        removed
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }

    /// Observe the count; the busy flag is `count > 0`
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

impl Default for PendingCounter {
    fn default() -> Self {
        Self::new()
    }
}
