//! Cooperative yielding with a configurable policy.
//!
//! Import code calls [`yield_now`] liberally at logical checkpoints; the
//! [`YieldTimer`] decides whether the call actually suspends. The timer is
//! owned by the import session and configured through [`YieldPolicy`], so
//! tests can inject a deterministic policy instead of relying on wall-clock
//! state.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// When cooperative code should suspend back to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldPolicy {
    /// Suspend when this much wall-clock time has elapsed since the last
    /// real suspension. The usual choice for frame-based hosts.
    TimeBudget(Duration),
    /// Suspend at every checkpoint. Deterministic; used in tests and by
    /// hosts that count polls instead of time.
    EveryCheckpoint,
    /// Never suspend. The import runs to the next external wait in one poll.
    Never,
}

impl Default for YieldPolicy {
    fn default() -> Self {
        // Half of a 60 Hz frame leaves the host room for its own work.
        Self::TimeBudget(Duration::from_millis(8))
    }
}

/// Tracks elapsed time against a [`YieldPolicy`].
///
/// Shared by all yield points of one import session via `Arc`.
pub struct YieldTimer {
    policy: YieldPolicy,
    last_yield: Mutex<Instant>,
    force_next: AtomicBool,
}

impl YieldTimer {
    /// Creates a timer with the given policy.
    pub fn new(policy: YieldPolicy) -> Self {
        Self {
            policy,
            last_yield: Mutex::new(Instant::now()),
            force_next: AtomicBool::new(false),
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> YieldPolicy {
        self.policy
    }

    /// Force the next checkpoint to actually suspend, regardless of the
    /// elapsed-time budget.
    pub fn force_next(&self) {
        self.force_next.store(true, Ordering::Release);
    }

    /// Whether a checkpoint reached now should suspend.
    pub fn should_yield(&self) -> bool {
        match self.policy {
            YieldPolicy::Never => false,
            YieldPolicy::EveryCheckpoint => true,
            YieldPolicy::TimeBudget(budget) => {
                if self.force_next.load(Ordering::Acquire) {
                    return true;
                }
                self.last_yield.lock().unwrap().elapsed() >= budget
            }
        }
    }

    /// Record that a suspension happened, restarting the budget window.
    pub fn mark_yielded(&self) {
        self.force_next.store(false, Ordering::Release);
        *self.last_yield.lock().unwrap() = Instant::now();
    }
}

impl Default for YieldTimer {
    fn default() -> Self {
        Self::new(YieldPolicy::default())
    }
}

/// Future returned by [`yield_now`].
///
/// If the timer says to suspend, the first poll returns `Pending` (and
/// restarts the timer's budget window); the next poll completes. Otherwise
/// the first poll completes immediately.
pub struct YieldNow {
    timer: Arc<YieldTimer>,
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        if self.timer.should_yield() {
            self.timer.mark_yielded();
            self.yielded = true;
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// Yields control back to the host if the timer's policy says so.
///
/// Calls can be liberal — with a time-budget policy the future only
/// actually suspends when enough wall-clock time has elapsed since the
/// last real suspension.
pub fn yield_now(timer: &Arc<YieldTimer>) -> YieldNow {
    YieldNow {
        timer: Arc::clone(timer),
        yielded: false,
    }
}

pub(crate) fn noop_waker() -> std::task::Waker {
    use std::task::{RawWaker, RawWakerVTable, Waker};
    fn noop(_: *const ()) {}
    fn clone(p: *const ()) -> RawWaker {
        RawWaker::new(p, &VTABLE)
    }
    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_checkpoint_suspends_once() {
        let timer = Arc::new(YieldTimer::new(YieldPolicy::EveryCheckpoint));
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut y = yield_now(&timer);
        assert!(Pin::new(&mut y).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut y).poll(&mut cx).is_ready());
    }

    #[test]
    fn never_completes_immediately() {
        let timer = Arc::new(YieldTimer::new(YieldPolicy::Never));
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut y = yield_now(&timer);
        assert!(Pin::new(&mut y).poll(&mut cx).is_ready());
    }

    #[test]
    fn time_budget_not_elapsed_completes_immediately() {
        let timer = Arc::new(YieldTimer::new(YieldPolicy::TimeBudget(
            Duration::from_secs(3600),
        )));
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut y = yield_now(&timer);
        assert!(Pin::new(&mut y).poll(&mut cx).is_ready());
    }

    #[test]
    fn force_next_overrides_budget() {
        let timer = Arc::new(YieldTimer::new(YieldPolicy::TimeBudget(
            Duration::from_secs(3600),
        )));
        timer.force_next();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut y = yield_now(&timer);
        assert!(Pin::new(&mut y).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut y).poll(&mut cx).is_ready());

        // The forced suspension consumed the flag.
        let mut y2 = yield_now(&timer);
        assert!(Pin::new(&mut y2).poll(&mut cx).is_ready());
    }

    #[test]
    fn zero_budget_always_suspends() {
        let timer = Arc::new(YieldTimer::new(YieldPolicy::TimeBudget(Duration::ZERO)));
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut y = yield_now(&timer);
        assert!(Pin::new(&mut y).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut y).poll(&mut cx).is_ready());
    }
}
