//! Cooperative cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use super::yield_now::{yield_now, YieldNow, YieldTimer};

/// Error returned when an import is cancelled at a checkpoint.
///
/// Import phases check the session's token at yield points and propagate
/// this with `?` to stop early. Decode jobs already dispatched run to
/// completion; cancellation is checked-next-checkpoint, not preemptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("import cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Token that signals cancellation to cooperative import code.
///
/// Cloning a token creates another handle to the same cancellation flag.
/// Calling [`cancel()`](CancellationToken::cancel) on any clone affects all.
#[derive(Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token (not cancelled).
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future combining a yield point with a cancellation check.
///
/// Behaves like [`YieldNow`] but also checks a cancellation token.
/// If the token is cancelled, returns `Err(Cancelled)` immediately.
/// Otherwise yields (when the timer's policy says so) and returns `Ok(())`.
pub struct Checkpoint {
    inner: YieldNow,
    token: Option<CancellationToken>,
}

impl Checkpoint {
    /// Creates a checkpoint that only yields (no cancellation).
    pub fn yield_only(timer: &Arc<YieldTimer>) -> Self {
        Self {
            inner: yield_now(timer),
            token: None,
        }
    }

    /// Creates a checkpoint that yields and checks the given token.
    pub fn with_token(timer: &Arc<YieldTimer>, token: CancellationToken) -> Self {
        Self {
            inner: yield_now(timer),
            token: Some(token),
        }
    }
}

impl Future for Checkpoint {
    type Output = Result<(), Cancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Cancelled>> {
        if let Some(token) = &self.token {
            if token.is_cancelled() {
                return Poll::Ready(Err(Cancelled));
            }
        }

        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(()) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}
