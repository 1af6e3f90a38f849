//! Dependency-ordered decode job graph.
//!
//! Decode work is expressed as units: pure functions over a read-only input
//! byte range and a disjoint output region. [`JobScheduler::spawn`] registers
//! a unit, [`JobScheduler::spawn_after`] orders one unit after others (the
//! sparse overlay after its dense fill), and [`JobScheduler::join_all`]
//! combines handles into one [`CompletionToken`] per primitive cluster.
//!
//! [`JobScheduler::dispatch`] runs every ready unit to completion on scoped
//! worker threads. Units never suspend mid-decode; the session polls
//! [`has_pending`](JobScheduler::has_pending) between batches and yields to
//! its host there. Unit failures are captured as job outcomes, never
//! unwound across the job boundary.

use std::cell::UnsafeCell;
use std::sync::Arc;

type JobFn<'s> = Box<dyn FnOnce() -> Result<(), String> + Send + 's>;

/// Handle to a scheduled decode unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle(usize);

/// Completion token combining several job handles.
///
/// Polls as complete only when every constituent job has finished. An empty
/// token is complete and successful.
#[derive(Debug, Clone, Default)]
pub struct CompletionToken {
    handles: Vec<JobHandle>,
}

impl CompletionToken {
    /// The handles this token joins.
    pub fn handles(&self) -> &[JobHandle] {
        &self.handles
    }
}

struct Job<'s> {
    unit: Option<JobFn<'s>>,
    deps: Vec<JobHandle>,
    outcome: Option<Result<(), String>>,
}

/// Dependency-ordered scheduler for decode units.
///
/// The lifetime `'s` lets units borrow the import session's buffers; all
/// units must have finished (or been discarded) before those borrows end.
pub struct JobScheduler<'s> {
    jobs: Vec<Job<'s>>,
}

impl<'s> JobScheduler<'s> {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Schedules a unit with no dependencies.
    pub fn spawn(&mut self, unit: impl FnOnce() -> Result<(), String> + Send + 's) -> JobHandle {
        self.push(Some(Box::new(unit)), Vec::new(), None)
    }

    /// Schedules a unit that runs only after all `deps` have succeeded.
    ///
    /// If any dependency fails, the unit never runs and its handle reports
    /// failure.
    pub fn spawn_after(
        &mut self,
        unit: impl FnOnce() -> Result<(), String> + Send + 's,
        deps: &[JobHandle],
    ) -> JobHandle {
        for dep in deps {
            assert!(dep.0 < self.jobs.len(), "dependency handle out of range");
        }
        self.push(Some(Box::new(unit)), deps.to_vec(), None)
    }

    /// Creates a handle that is already failed with the given message.
    ///
    /// Used when a unit cannot even be constructed (e.g. an invalid
    /// component type for the requested semantic).
    pub fn failed_handle(&mut self, message: impl Into<String>) -> JobHandle {
        self.push(None, Vec::new(), Some(Err(message.into())))
    }

    fn push(
        &mut self,
        unit: Option<JobFn<'s>>,
        deps: Vec<JobHandle>,
        outcome: Option<Result<(), String>>,
    ) -> JobHandle {
        let handle = JobHandle(self.jobs.len());
        self.jobs.push(Job {
            unit,
            deps,
            outcome,
        });
        handle
    }

    /// Combines handles into a single completion token.
    pub fn join_all(&self, handles: &[JobHandle]) -> CompletionToken {
        CompletionToken {
            handles: handles.to_vec(),
        }
    }

    /// Whether any unit still has to run.
    pub fn has_pending(&self) -> bool {
        self.jobs.iter().any(|j| j.outcome.is_none())
    }

    /// Whether the job behind `handle` has finished (successfully or not).
    pub fn is_done(&self, handle: JobHandle) -> bool {
        self.jobs[handle.0].outcome.is_some()
    }

    /// Whether the job behind `handle` finished with a failure.
    pub fn is_failed(&self, handle: JobHandle) -> bool {
        matches!(self.jobs[handle.0].outcome, Some(Err(_)))
    }

    /// The failure message of a job, if it failed.
    pub fn job_error(&self, handle: JobHandle) -> Option<&str> {
        match &self.jobs[handle.0].outcome {
            Some(Err(message)) => Some(message),
            _ => None,
        }
    }

    /// Whether every job joined by `token` has finished.
    pub fn token_complete(&self, token: &CompletionToken) -> bool {
        token.handles.iter().all(|&h| self.is_done(h))
    }

    /// Whether any job joined by `token` has failed.
    pub fn token_failed(&self, token: &CompletionToken) -> bool {
        token.handles.iter().any(|&h| self.is_failed(h))
    }

    /// Failure messages of all failed jobs joined by `token`.
    pub fn token_errors(&self, token: &CompletionToken) -> Vec<&str> {
        token
            .handles
            .iter()
            .filter_map(|&h| self.job_error(h))
            .collect()
    }

    /// Runs one batch: every unit whose dependencies have all succeeded.
    ///
    /// Units whose dependencies failed are marked failed without running.
    /// Returns the number of units executed in this batch; repeated calls
    /// drain the graph. A unit that panics is recorded as failed, so panics
    /// never cross the job boundary.
    pub fn dispatch(&mut self) -> usize {
        // Propagate dependency failures. Dependencies always precede their
        // dependents, so one forward pass settles the whole chain.
        for i in 0..self.jobs.len() {
            if self.jobs[i].outcome.is_some() {
                continue;
            }
            let dep_failed = self.jobs[i]
                .deps
                .iter()
                .any(|&d| matches!(self.jobs[d.0].outcome, Some(Err(_))));
            if dep_failed {
                self.jobs[i].unit = None;
                self.jobs[i].outcome = Some(Err("dependency failed".into()));
            }
        }

        let mut ready = Vec::new();
        for i in 0..self.jobs.len() {
            if self.jobs[i].outcome.is_some() {
                continue;
            }
            let deps_done = self.jobs[i]
                .deps
                .iter()
                .all(|&d| matches!(self.jobs[d.0].outcome, Some(Ok(()))));
            if deps_done {
                if let Some(unit) = self.jobs[i].unit.take() {
                    ready.push((i, unit));
                }
            }
        }
        if ready.is_empty() {
            return 0;
        }

        let count = ready.len();
        let outcomes = std::thread::scope(|scope| {
            let workers: Vec<_> = ready
                .into_iter()
                .map(|(i, unit)| (i, scope.spawn(unit)))
                .collect();
            workers
                .into_iter()
                .map(|(i, worker)| {
                    let outcome = match worker.join() {
                        Ok(result) => result,
                        Err(_) => Err("decode unit panicked".into()),
                    };
                    (i, outcome)
                })
                .collect::<Vec<_>>()
        });
        for (i, outcome) in outcomes {
            self.jobs[i].outcome = Some(outcome);
        }
        count
    }
}

impl Default for JobScheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-initialized output storage shared by the decode units that fill it.
///
/// The buffer is pinned by the `Arc` clones inside [`StridedWriter`]s; once
/// all units have run and dropped their writers, [`into_vec`]
/// (`OutputBuffer::into_vec`) is the single point that reclaims the bytes.
/// A buffer with live writers cannot be reclaimed, which rules out
/// use-after-release by construction.
pub struct OutputBuffer {
    data: Box<[UnsafeCell<u8>]>,
}

// Writers touch disjoint byte cells (see `writer`), so sharing across
// worker threads is sound.
unsafe impl Sync for OutputBuffer {}

impl OutputBuffer {
    /// Allocates `len` zeroed bytes.
    pub fn new(len: usize) -> Arc<Self> {
        let data = (0..len).map(|_| UnsafeCell::new(0u8)).collect();
        Arc::new(Self { data })
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Creates a strided writer over `count` elements of `elem_size` bytes,
    /// starting at `byte_offset` and advancing `stride` bytes per element.
    ///
    /// # Safety
    ///
    /// No two writers whose byte ranges overlap may be used concurrently.
    /// The caller guarantees exclusivity by construction: attribute writers
    /// of one interleaved block use the same stride with non-overlapping
    /// column offsets, and writers that revisit bytes (sparse overlays,
    /// bone sorting) run in units ordered after the first writer via
    /// [`JobScheduler::spawn_after`].
    pub unsafe fn writer(
        self: &Arc<Self>,
        byte_offset: usize,
        stride: usize,
        elem_size: usize,
        count: usize,
    ) -> StridedWriter {
        assert!(elem_size > 0, "element size must be non-zero");
        if count > 0 {
            assert!(count == 1 || stride > 0, "stride must be non-zero");
            let end = byte_offset + (count - 1) * stride + elem_size;
            assert!(end <= self.len(), "writer range exceeds buffer");
        }
        StridedWriter {
            buffer: Arc::clone(self),
            byte_offset,
            stride,
            elem_size,
            count,
        }
    }

    /// Reclaims the bytes once no writers remain.
    ///
    /// Returns `None` while any [`StridedWriter`] (or other clone of the
    /// `Arc`) is still alive.
    pub fn into_vec(self: Arc<Self>) -> Option<Vec<u8>> {
        let buffer = Arc::try_unwrap(self).ok()?;
        Some(
            buffer
                .data
                .into_vec()
                .into_iter()
                .map(UnsafeCell::into_inner)
                .collect(),
        )
    }
}

/// Bounds-checked strided view into an [`OutputBuffer`].
///
/// Each writer addresses `count` elements of `elem_size` bytes at
/// `byte_offset + index * stride`. Writers keep their buffer alive; drop
/// them (by letting the owning decode unit finish) before reclaiming the
/// buffer. Clones address the same region and fall under the original's
/// exclusivity contract: units holding clones must be ordered.
#[derive(Clone)]
pub struct StridedWriter {
    buffer: Arc<OutputBuffer>,
    byte_offset: usize,
    stride: usize,
    elem_size: usize,
    count: usize,
}

impl StridedWriter {
    /// Number of addressable elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Element size in bytes.
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Writes `bytes` at element `index`.
    ///
    /// Panics if `index` is out of range or `bytes` exceeds the element
    /// size; data-dependent indices (sparse patches) must be validated by
    /// the caller before writing.
    pub fn write(&self, index: usize, bytes: &[u8]) {
        assert!(index < self.count, "element index out of range");
        assert!(bytes.len() <= self.elem_size, "element overflow");
        let offset = self.byte_offset + index * self.stride;
        // UnsafeCell<u8> is repr(transparent), so the slice of cells can be
        // addressed as raw bytes. Exclusivity of this range is guaranteed by
        // the `writer` contract.
        let base = self.buffer.data.as_ptr() as *mut u8;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), base.add(offset), bytes.len());
        }
    }

    /// Copies element `index` into `out`.
    ///
    /// Only meaningful for bytes this writer's own unit (or a unit ordered
    /// before it) has written.
    pub fn read_into(&self, index: usize, out: &mut [u8]) {
        assert!(index < self.count, "element index out of range");
        assert!(out.len() <= self.elem_size, "element overflow");
        let offset = self.byte_offset + index * self.stride;
        let base = self.buffer.data.as_ptr() as *const u8;
        unsafe {
            std::ptr::copy_nonoverlapping(base.add(offset), out.as_mut_ptr(), out.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn spawn_and_dispatch() {
        let counter = AtomicUsize::new(0);
        let mut scheduler = JobScheduler::new();
        let h = scheduler.spawn(|| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(!scheduler.is_done(h));
        assert_eq!(scheduler.dispatch(), 1);
        assert!(scheduler.is_done(h));
        assert!(!scheduler.is_failed(h));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn dependent_runs_after_dependency() {
        let order = std::sync::Mutex::new(Vec::new());
        let mut scheduler = JobScheduler::new();

        let first = scheduler.spawn(|| {
            order.lock().unwrap().push("dense");
            Ok(())
        });
        let _second = scheduler.spawn_after(
            || {
                order.lock().unwrap().push("sparse");
                Ok(())
            },
            &[first],
        );

        // First batch runs only the dense pass.
        assert_eq!(scheduler.dispatch(), 1);
        assert_eq!(scheduler.dispatch(), 1);
        assert_eq!(scheduler.dispatch(), 0);
        assert_eq!(*order.lock().unwrap(), vec!["dense", "sparse"]);
    }

    #[test]
    fn dependency_failure_propagates() {
        let mut scheduler = JobScheduler::new();
        let first = scheduler.spawn(|| Err("bad data".into()));
        let second = scheduler.spawn_after(|| Ok(()), &[first]);

        scheduler.dispatch();
        scheduler.dispatch();

        assert!(scheduler.is_failed(first));
        assert!(scheduler.is_failed(second));
        assert_eq!(scheduler.job_error(first), Some("bad data"));
        assert_eq!(scheduler.job_error(second), Some("dependency failed"));
    }

    #[test]
    fn failed_handle_reports_failure() {
        let mut scheduler = JobScheduler::new();
        let h = scheduler.failed_handle("invalid component type");
        assert!(scheduler.is_done(h));
        assert!(scheduler.is_failed(h));

        let token = scheduler.join_all(&[h]);
        assert!(scheduler.token_complete(&token));
        assert!(scheduler.token_failed(&token));
        assert_eq!(scheduler.token_errors(&token), vec!["invalid component type"]);
    }

    #[test]
    fn token_tracks_all_handles() {
        let mut scheduler = JobScheduler::new();
        let a = scheduler.spawn(|| Ok(()));
        let b = scheduler.spawn_after(|| Ok(()), &[a]);
        let token = scheduler.join_all(&[a, b]);

        assert!(!scheduler.token_complete(&token));
        scheduler.dispatch();
        assert!(!scheduler.token_complete(&token));
        scheduler.dispatch();
        assert!(scheduler.token_complete(&token));
        assert!(!scheduler.token_failed(&token));
    }

    #[test]
    fn empty_token_is_complete() {
        let scheduler = JobScheduler::new();
        let token = scheduler.join_all(&[]);
        assert!(scheduler.token_complete(&token));
        assert!(!scheduler.token_failed(&token));
    }

    #[test]
    fn panicking_unit_fails() {
        let mut scheduler = JobScheduler::new();
        let h = scheduler.spawn(|| panic!("boom"));
        scheduler.dispatch();
        assert!(scheduler.is_failed(h));
        assert_eq!(scheduler.job_error(h), Some("decode unit panicked"));
    }

    #[test]
    fn parallel_writers_fill_disjoint_columns() {
        let buffer = OutputBuffer::new(24);
        let mut scheduler = JobScheduler::new();

        // Two attributes interleaved at stride 8: u32 column at offset 0,
        // u32 column at offset 4.
        let first = unsafe { buffer.writer(0, 8, 4, 3) };
        let second = unsafe { buffer.writer(4, 8, 4, 3) };
        scheduler.spawn(move || {
            for i in 0..3 {
                first.write(i, &(i as u32 + 1).to_le_bytes());
            }
            Ok(())
        });
        scheduler.spawn(move || {
            for i in 0..3 {
                second.write(i, &(i as u32 + 100).to_le_bytes());
            }
            Ok(())
        });
        scheduler.dispatch();

        let bytes = buffer.into_vec().expect("writers dropped");
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, vec![1, 100, 2, 101, 3, 102]);
    }

    #[test]
    fn into_vec_refuses_while_writer_alive() {
        let buffer = OutputBuffer::new(4);
        let writer = unsafe { buffer.writer(0, 4, 4, 1) };
        assert!(Arc::clone(&buffer).into_vec().is_none());
        drop(writer);
        assert!(buffer.into_vec().is_some());
    }

    #[test]
    fn writer_read_back() {
        let buffer = OutputBuffer::new(8);
        let writer = unsafe { buffer.writer(0, 4, 4, 2) };
        writer.write(1, &7u32.to_le_bytes());
        let mut out = [0u8; 4];
        writer.read_into(1, &mut out);
        assert_eq!(u32::from_le_bytes(out), 7);
    }

    #[test]
    #[should_panic(expected = "writer range exceeds buffer")]
    fn writer_rejects_out_of_range() {
        let buffer = OutputBuffer::new(8);
        let _ = unsafe { buffer.writer(0, 4, 4, 3) };
    }
}
