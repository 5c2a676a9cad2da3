//! Deadline and cancellation scope of a single run.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::concurrency::signal::CompletionCause;

/// Upper bound used when the requested run time would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Bounds a run by a deadline and by the caller's cancellation.
///
/// The scope owns a child of the caller's token, so cancelling the caller's token cancels the
/// run while cancelling the scope never affects the caller.
#[derive(Debug, Clone)]
pub struct RunScope {
    token: CancellationToken,
    deadline: Instant,
}

impl RunScope {
    /// Creates a scope expiring `max_run_time` from now or when `parent` is cancelled.
    pub fn new(parent: &CancellationToken, max_run_time: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(max_run_time)
            .unwrap_or_else(|| now + FAR_FUTURE);

        Self {
            token: parent.child_token(),
            deadline,
        }
    }

    /// Returns the instant at which the run times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns why the scope expired without waiting, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over the deadline when both apply.
    pub fn check(&self) -> Option<CompletionCause> {
        if self.token.is_cancelled() {
            return Some(CompletionCause::Cancelled);
        }

        if Instant::now() >= self.deadline {
            return Some(CompletionCause::DeadlineExceeded);
        }

        None
    }

    /// Waits until the scope expires and returns why. The future is cancel safe.
    pub async fn expired(&self) -> CompletionCause {
        tokio::select! {
            biased;

            _ = self.token.cancelled() => CompletionCause::Cancelled,
            _ = sleep_until(self.deadline) => CompletionCause::DeadlineExceeded,
        }
    }

    /// Cancels the run without affecting the caller's token.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_at_deadline() {
        let parent = CancellationToken::new();
        let scope = RunScope::new(&parent, Duration::from_millis(50));

        assert_eq!(scope.check(), None);
        assert_eq!(scope.expired().await, CompletionCause::DeadlineExceeded);
        assert_eq!(scope.check(), Some(CompletionCause::DeadlineExceeded));
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn parent_cancellation_wins_over_deadline() {
        let parent = CancellationToken::new();
        let scope = RunScope::new(&parent, Duration::from_secs(3600));

        parent.cancel();

        assert_eq!(scope.check(), Some(CompletionCause::Cancelled));
        assert_eq!(scope.expired().await, CompletionCause::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_the_scope_leaves_the_parent_alone() {
        let parent = CancellationToken::new();
        let scope = RunScope::new(&parent, Duration::from_secs(3600));

        scope.cancel();

        assert_eq!(scope.check(), Some(CompletionCause::Cancelled));
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn huge_run_time_does_not_overflow() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let scope = RunScope::new(&CancellationToken::new(), Duration::MAX);
            assert!(scope.deadline() > Instant::now());
            assert_eq!(scope.check(), None);
        });
    }
}
