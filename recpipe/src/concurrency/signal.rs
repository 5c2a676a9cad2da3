//! Fire-once completion signal shared by all participants of a run.
//!
//! The signal is backed by a tokio watch channel holding the completion cause. Firing writes
//! the cause only when none is present yet, so concurrent fires from several participants
//! resolve to exactly one winner and later fires are no-ops.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::types::WorkerId;

/// Reason a run completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionCause {
    /// The source was fully consumed.
    EndOfStream,
    /// A receiver decoded an entity satisfying the predicate.
    MatchFound { worker_id: WorkerId },
    /// The maximum run time elapsed.
    DeadlineExceeded,
    /// The caller cancelled the run.
    Cancelled,
    /// The source stream failed with an unrecoverable read error.
    SourceFailed,
}

impl CompletionCause {
    /// Returns a stable, lowercase name for the cause, used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionCause::EndOfStream => "end_of_stream",
            CompletionCause::MatchFound { .. } => "match_found",
            CompletionCause::DeadlineExceeded => "deadline_exceeded",
            CompletionCause::Cancelled => "cancelled",
            CompletionCause::SourceFailed => "source_failed",
        }
    }
}

impl fmt::Display for CompletionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionCause::MatchFound { worker_id } => {
                write!(f, "match found by receiver #{worker_id}")
            }
            CompletionCause::EndOfStream => f.write_str("end of stream"),
            CompletionCause::DeadlineExceeded => f.write_str("deadline exceeded"),
            CompletionCause::Cancelled => f.write_str("cancelled"),
            CompletionCause::SourceFailed => f.write_str("source failed"),
        }
    }
}

/// Firing side of the completion signal.
///
/// Cloned into every participant that is allowed to complete the run.
#[derive(Debug, Clone)]
pub struct CompletionTx {
    tx: Arc<watch::Sender<Option<CompletionCause>>>,
}

impl CompletionTx {
    /// Fires the signal with `cause`.
    ///
    /// Returns `true` only for the call that actually fired the signal. Every later call,
    /// including concurrent ones, returns `false` and leaves the stored cause untouched.
    pub fn fire(&self, cause: CompletionCause) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }

            *state = Some(cause);
            true
        })
    }

    /// Returns the cause the signal fired with, if it fired.
    pub fn cause(&self) -> Option<CompletionCause> {
        *self.tx.borrow()
    }

    /// Creates a new observer of this signal.
    pub fn subscribe(&self) -> CompletionRx {
        CompletionRx {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observing side of the completion signal.
#[derive(Debug, Clone)]
pub struct CompletionRx {
    rx: watch::Receiver<Option<CompletionCause>>,
}

impl CompletionRx {
    /// Returns the cause the signal fired with, if it fired.
    pub fn cause(&self) -> Option<CompletionCause> {
        *self.rx.borrow()
    }

    /// Waits until the signal fires and returns its cause.
    ///
    /// Resolves immediately when the signal already fired. Returns `None` if every
    /// [`CompletionTx`] was dropped without firing. The future is cancel safe.
    pub async fn fired(&mut self) -> Option<CompletionCause> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(state) => *state,
            Err(_) => None,
        }
    }
}

/// Creates a new, unfired completion signal.
pub fn create_completion_signal() -> (CompletionTx, CompletionRx) {
    let (tx, rx) = watch::channel(None);
    (CompletionTx { tx: Arc::new(tx) }, CompletionRx { rx })
}
