//! # Cue timer
//!
//! When the buffer hands a marker to the scheduler, the marker cannot be
//! placed on the render clock like audio. Instead it is armed on a
//! [`CueTimer`] with a delay equal to the audio still ahead of it, so it fires
//! when that audio has been rendered.

use std::fmt;
use std::time::Duration;

use core_async::runtime::Handle;
use core_async::sync::{mpsc, CancellationToken};
use core_async::{task, time};
use parking_lot::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::chunk::CuePoint;
use crate::completion::Completion;

/// Outcome of a cue point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueEvent {
    pub id: Uuid,
    /// `true` when the render clock reached the cue, `false` when it was
    /// discarded (reset, dispose, cancellation).
    pub reached: bool,
}

/// A marker taken off the playback queue, waiting for its instant.
pub enum ScheduledMarker {
    Cue {
        point: CuePoint,
        sink: mpsc::UnboundedSender<CueEvent>,
    },
    Completion(Completion),
}

impl ScheduledMarker {
    /// The render clock reached the marker.
    pub fn fire(self) {
        self.settle(true);
    }

    /// The marker will never be reached.
    pub fn discard(self) {
        self.settle(false);
    }

    fn settle(self, reached: bool) {
        match self {
            ScheduledMarker::Cue { point, sink } => {
                trace!(cue = %point.id, reached, "Cue settled");
                // A closed sink means the consumer already shut down.
                let _ = sink.send(CueEvent {
                    id: point.id,
                    reached,
                });
            }
            ScheduledMarker::Completion(completion) => completion.resolve(reached),
        }
    }
}

impl fmt::Debug for ScheduledMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledMarker::Cue { point, .. } => f.debug_tuple("Cue").field(&point.id).finish(),
            ScheduledMarker::Completion(c) => f.debug_tuple("Completion").field(c).finish(),
        }
    }
}

/// Fires markers after a delay.
///
/// The buffer arms markers while it evaluates, so that a concurrent reset
/// cancels every marker armed before it. Implementations must return without
/// calling back into the buffer.
pub trait CueTimer: Send + Sync {
    /// Fires `marker` once `delay` has elapsed.
    fn fire_after(&self, delay: Duration, marker: ScheduledMarker);

    /// Discards every marker that has not fired yet.
    fn cancel_pending(&self);
}

/// [`CueTimer`] backed by runtime tasks.
///
/// Each armed marker is a task sleeping for its delay. Cancellation swaps in a
/// fresh token so markers armed afterwards are unaffected.
pub struct TokioCueTimer {
    handle: Handle,
    token: Mutex<CancellationToken>,
}

impl TokioCueTimer {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Uses the runtime the caller is running on.
    pub fn from_current() -> Option<Self> {
        core_async::runtime::current_handle().map(Self::new)
    }
}

impl CueTimer for TokioCueTimer {
    fn fire_after(&self, delay: Duration, marker: ScheduledMarker) {
        if delay.is_zero() {
            marker.fire();
            return;
        }

        let token = self.token.lock().clone();
        task::spawn_on(&self.handle, async move {
            core_async::select! {
                _ = token.cancelled() => marker.discard(),
                _ = time::sleep(delay) => marker.fire(),
            }
        });
    }

    fn cancel_pending(&self) {
        let previous = std::mem::replace(&mut *self.token.lock(), CancellationToken::new());
        previous.cancel();
    }
}

impl Drop for TokioCueTimer {
    fn drop(&mut self) {
        self.token.lock().cancel();
    }
}

impl fmt::Debug for TokioCueTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioCueTimer").finish_non_exhaustive()
    }
}
