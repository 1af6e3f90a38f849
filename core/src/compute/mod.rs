//! Cooperative scheduling primitives for import work.
//!
//! This module provides the building blocks the importer uses to spread
//! work across host ticks and worker threads:
//!
//! - [`YieldPolicy`] / [`YieldTimer`] — When cooperative code should
//!   suspend back to its host
//! - [`YieldNow`] — Cooperative yielding future
//! - [`CancellationToken`] / [`Checkpoint`] — Cooperative cancellation,
//!   checked at yield points
//! - [`IoHandle`] — Channel-based future for external IO results
//! - [`FetchProvider`] — Trait for the byte-download collaborator
//! - [`JobScheduler`] — Dependency-ordered decode job graph with
//!   [`JobHandle`]s and joined [`CompletionToken`]s
//! - [`OutputBuffer`] / [`StridedWriter`] — Shared decode output storage
//!   with disjoint per-unit write ranges
//!
//! The executors here use noop wakers and manual polling: the host drives
//! progress by polling the import future, and decode jobs run to completion
//! on scoped worker threads during [`JobScheduler::dispatch`]. No async
//! runtime is required.

mod cancellation;
mod io_handle;
mod scheduler;
mod yield_now;

pub use cancellation::{CancellationToken, Cancelled, Checkpoint};
pub use io_handle::{FetchProvider, IoHandle};
pub use scheduler::{CompletionToken, JobHandle, JobScheduler, OutputBuffer, StridedWriter};
pub use yield_now::{yield_now, YieldNow, YieldPolicy, YieldTimer};

pub(crate) use yield_now::noop_waker;
