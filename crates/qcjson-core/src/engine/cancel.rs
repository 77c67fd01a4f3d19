use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A cancellation request shared between a caller and a running backend.
///
/// The engine never inspects this signal; it only hands it to
/// [`super::backend::ComputeBackend::compute`]. Backends that can stop early poll
/// [`CancellationSignal::is_cancelled`] and report
/// [`super::backend::ComputeError::Cancelled`].
///
/// Clones share the same flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationSignal {
    /// A signal that is never triggered unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also counts as cancelled once `timeout` has elapsed.
    ///
    /// A timeout too large to represent as an [`Instant`] sets no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: deadline_after(timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A clone sharing this signal's flag with its own deadline.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, deadline_after(timeout)) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.is_expired()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Why the signal fired, for error messages. `None` while it has not fired.
    pub fn reason(&self) -> Option<&'static str> {
        if self.flag.load(Ordering::SeqCst) {
            Some("cancelled by caller")
        } else if self.is_expired() {
            Some("deadline exceeded")
        } else {
            None
        }
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal_is_not_cancelled() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        assert_eq!(signal.reason(), None);
        assert_eq!(signal.remaining(), None);
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), Some("cancelled by caller"));
    }

    #[test]
    fn elapsed_deadline_counts_as_cancelled() {
        let signal = CancellationSignal::with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), Some("deadline exceeded"));
        assert_eq!(signal.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn future_deadline_is_not_cancelled_yet() {
        let signal = CancellationSignal::with_timeout(Duration::from_secs(3600));
        assert!(!signal.is_cancelled());
        assert!(signal.remaining().unwrap() > Duration::from_secs(3500));
    }

    #[test]
    fn child_shares_flag_and_keeps_earliest_deadline() {
        let parent = CancellationSignal::with_timeout(Duration::from_secs(10));
        let child = parent.child_with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn unrepresentable_timeout_sets_no_deadline() {
        let signal = CancellationSignal::with_timeout(Duration::MAX);
        assert_eq!(signal.deadline(), None);
        assert!(!signal.is_cancelled());

        let child = CancellationSignal::new().child_with_timeout(Duration::from_secs_f64(1e19));
        assert_eq!(child.deadline(), None);

        let parent = CancellationSignal::with_timeout(Duration::from_secs(10));
        let child = parent.child_with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), parent.deadline());
    }
}
