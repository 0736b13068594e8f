//! One-shot completion signals.
//!
//! A [`Completion`] is the producing side of a boolean outcome ("did the
//! change become audible?"); the matching [`CompletionHandle`] lets the caller
//! await or poll it. Resolving consumes the `Completion`, so an outcome is
//! delivered at most once. Dropping an unresolved `Completion` delivers
//! `false`, so it is delivered at least once as well.

use std::fmt;

use core_async::sync::oneshot;

/// Producing side of a completion.
pub struct Completion {
    sender: Option<oneshot::Sender<bool>>,
}

impl Completion {
    /// Creates a linked completion/handle pair.
    pub fn new() -> (Completion, CompletionHandle) {
        let (sender, receiver) = oneshot::channel();
        (
            Completion {
                sender: Some(sender),
            },
            CompletionHandle {
                receiver,
                outcome: None,
            },
        )
    }

    /// Delivers `success` to the handle.
    pub fn resolve(mut self, success: bool) {
        self.send(success);
    }

    fn send(&mut self, success: bool) {
        if let Some(sender) = self.sender.take() {
            // The handle may already be gone; nobody is left to tell.
            let _ = sender.send(success);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.send(false);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.sender.is_some())
            .finish()
    }
}

/// Receiving side of a completion.
#[derive(Debug)]
pub struct CompletionHandle {
    receiver: oneshot::Receiver<bool>,
    outcome: Option<bool>,
}

impl CompletionHandle {
    /// Waits for the outcome.
    pub async fn wait(self) -> bool {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        self.receiver.await.unwrap_or(false)
    }

    /// Returns the outcome if it has been delivered, without waiting.
    pub fn try_result(&mut self) -> Option<bool> {
        if self.outcome.is_none() {
            self.outcome = match self.receiver.try_recv() {
                Ok(success) => Some(success),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(false),
            };
        }
        self.outcome
    }

    pub fn is_resolved(&mut self) -> bool {
        self.try_result().is_some()
    }
}
