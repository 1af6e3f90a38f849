//! Channel-based futures for external IO results.

use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use std::task::{Context, Poll};

/// Handle to an IO task running outside the importer.
///
/// Works with cooperative executors using noop wakers via channel-based
/// polling: the host performs the actual IO however it likes (threads,
/// an async runtime, a browser fetch) and sends the result through the
/// channel; the importer polls the handle at its checkpoints.
pub struct IoHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> IoHandle<T> {
    /// Creates a new IO handle wrapping the given receiver.
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Creates a handle that is already resolved with the given value.
    pub fn ready(value: T) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(value);
        Self { receiver }
    }

    /// Attempts to retrieve the result without blocking.
    ///
    /// Returns `Some(T)` if the IO task has completed, `None` otherwise.
    /// This consumes the value — subsequent calls return `None`.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until the IO task completes and returns the result.
    ///
    /// Returns `None` if the sender was dropped without sending.
    ///
    /// # Warning
    ///
    /// This blocks the calling thread. Prefer `try_recv()` or `.await`
    /// in frame loops.
    pub fn recv(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<T> Future for IoHandle<T> {
    type Output = Option<T>;

    /// Polls the IO task for completion.
    ///
    /// Returns `Poll::Ready(Some(T))` if the task completed,
    /// `Poll::Ready(None)` if the sender was dropped,
    /// `Poll::Pending` if the task is still running.
    ///
    /// Designed for manual polling with a noop waker — the host drives the
    /// IO; this just checks the channel.
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.receiver.try_recv() {
            Ok(val) => Poll::Ready(Some(val)),
            Err(mpsc::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}

/// The byte-download collaborator for external buffer URIs.
///
/// Downloading is outside the importer's scope: when a glTF buffer
/// references an external URI, the importer asks the provider for the bytes
/// and suspends at checkpoints until the handle resolves. `Err` carries a
/// host-readable description and aborts the import.
pub trait FetchProvider {
    /// Start fetching the given URI, returning a handle for the result.
    fn fetch(&self, uri: &str) -> IoHandle<Result<Vec<u8>, String>>;
}
