//! Cross-thread completion delivery.
//!
//! The remote client may finish a call on any thread it likes. Completion
//! values must never touch per-request state from that thread; the
//! done-callback owns nothing but a channel sender, and the value crosses
//! over to the task that owns the request. The owning side can probe for
//! a completion that already happened while the issuing call was still on
//! the stack, or await one that is genuinely in flight.
//!
//! Dropping the [`PendingCompletion`] (request torn down) leaves a late
//! completion with nowhere to land; it is discarded without side effects.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Create a linked pair: the hop side travels into the remote call, the
/// pending side stays with the request.
pub fn completion<T: Send + 'static>() -> (CompletionHop<T>, PendingCompletion<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionHop { tx }, PendingCompletion { rx })
}

/// Sending half of a completion pair.
pub struct CompletionHop<T> {
    tx: oneshot::Sender<T>,
}

impl<T: Send + 'static> CompletionHop<T> {
    /// Box into the `FnOnce` callback handed to the remote caller.
    ///
    /// Safe to invoke from any thread: it moves the outcome into the
    /// channel and returns. If the request side is already gone the value
    /// is dropped.
    pub fn into_done(self) -> Box<dyn FnOnce(T) + Send> {
        Box::new(move |value| {
            let _ = self.tx.send(value);
        })
    }
}

/// Receiving half of a completion pair, held by the request owner.
pub struct PendingCompletion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> PendingCompletion<T> {
    /// Probe for a completion that was delivered synchronously, before the
    /// issuing call returned. Does not block.
    pub fn try_take(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Await the completion. Returns `None` if the remote side dropped the
    /// callback without ever invoking it; no outcome will arrive and the
    /// host must dispose of the request itself.
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
