//! Cooperative cancellation for in-flight requests.
//!
//! Each client owns one live `AbortSignal`. Requests capture the signal that
//! is current when they start; `AbortController::abort` trips it and installs
//! a fresh signal with the next generation number, so later requests are
//! unaffected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SignalState {
    aborted: AtomicBool,
    notify: Notify,
}

/// Cancellation flag shared by every request of one generation
#[derive(Debug, Clone)]
pub struct AbortSignal {
    generation: u64,
    state: Arc<SignalState>,
}

impl AbortSignal {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            state: Arc::new(SignalState::default()),
        }
    }

    /// Generation this signal belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the signal has been tripped
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is tripped
    pub async fn aborted(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a concurrent trip
        // cannot slip between the check and the await.
        notified.as_mut().enable();

        if self.is_aborted() {
            return;
        }
        notified.await;
    }

    fn trip(&self) {
        self.state.aborted.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }
}

/// Owner of the current abort signal of a client
#[derive(Debug)]
pub struct AbortController {
    current: Mutex<AbortSignal>,
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(AbortSignal::new(0)),
        }
    }

    /// Signal that requests starting now should observe
    pub fn signal(&self) -> AbortSignal {
        self.current.lock().clone()
    }

    /// Current generation number
    pub fn generation(&self) -> u64 {
        self.current.lock().generation
    }

    /// Trip the current signal and install a fresh one.
    ///
    /// Returns the generation of the new signal.
    pub fn abort(&self) -> u64 {
        let mut current = self.current.lock();
        current.trip();
        *current = AbortSignal::new(current.generation + 1);
        current.generation
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_abort_replaces_signal() {
        let controller = AbortController::new();
        let before = controller.signal();
        assert_eq!(before.generation(), 0);
        assert!(!before.is_aborted());

        assert_eq!(controller.abort(), 1);
        assert!(before.is_aborted());

        let after = controller.signal();
        assert_eq!(after.generation(), 1);
        assert!(!after.is_aborted());
    }

    #[tokio::test]
    async fn test_aborted_resolves_for_waiters() {
        let controller = Arc::new(AbortController::new());
        let signal = controller.signal();

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
        });

        tokio::task::yield_now().await;
        controller.abort();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should observe the abort")
            .unwrap();
    }

    #[tokio::test]
    async fn test_aborted_resolves_immediately_when_already_tripped() {
        let controller = AbortController::new();
        let signal = controller.signal();
        controller.abort();

        tokio::time::timeout(Duration::from_millis(100), signal.aborted())
            .await
            .expect("already-tripped signal resolves at once");
    }

    #[test]
    fn test_fresh_signal_not_tripped_by_old_abort() {
        let controller = AbortController::new();
        controller.abort();
        let fresh = controller.signal();

        let mut waiter = tokio_test::task::spawn(fresh.aborted());
        tokio_test::assert_pending!(waiter.poll());

        controller.abort();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
