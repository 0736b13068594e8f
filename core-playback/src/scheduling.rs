//! # Render-clock scheduling
//!
//! Places audio chunks back to back on the render clock and reports how much
//! of the placed audio is still unplayed.
//!
//! All bookkeeping is in frames at the render clock's sample rate; seconds
//! only appear at the API boundary. Placement is decided under an internal
//! lock and yields a [`Placement`]; the host [`RenderOutput`] only sees the
//! audio once that placement is rendered, outside any lock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{PcmBuffer, RenderOutput};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::chunk::AudioChunk;
use crate::error::{PlaybackError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Timeline {
    /// Render frame of the first chunk since the last reset.
    first_frame: Option<u64>,
    /// Render frame at which the next chunk starts.
    next_frame: u64,
    /// Frames placed since `first_frame`.
    total_frames: u64,
    /// Last computed remaining frames, served while the clock is stopped.
    last_remaining: u64,
}

/// Maps chunks onto the render clock of one output format.
///
/// Re-created whenever the output format changes.
pub struct PlaybackScheduling {
    output: Arc<dyn RenderOutput>,
    sample_rate: u32,
    timeline: Mutex<Timeline>,
}

impl PlaybackScheduling {
    pub fn new(output: Arc<dyn RenderOutput>) -> Self {
        let sample_rate = output.sample_rate();
        Self {
            output,
            sample_rate,
            timeline: Mutex::new(Timeline::default()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether the render clock is currently advancing.
    pub fn clock_running(&self) -> bool {
        self.output.now_frames().is_some()
    }

    /// Places `audio` right after the previously placed chunk and hands it
    /// to the render output.
    ///
    /// Returns the number of frames placed. See [`place`](Self::place) for
    /// the errors.
    pub fn schedule(&self, audio: AudioChunk) -> Result<u64> {
        let placement = self.place(audio)?;
        let frames = placement.frames();
        placement.render();
        Ok(frames)
    }

    /// Reserves the render frames for `audio` without calling the output.
    ///
    /// The first chunk after a reset is anchored at the current render frame.
    /// When the render clock has already passed the end of the placed audio
    /// the timeline is re-anchored at the current frame instead of placing the
    /// chunk in the past.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::FormatMismatch`] when the chunk's sample rate differs
    ///   from the render clock's
    /// - [`PlaybackError::ClockStopped`] when the render clock is not running;
    ///   the chunk is dropped
    pub fn place(&self, audio: AudioChunk) -> Result<Placement> {
        if audio.sample_rate() != self.sample_rate {
            return Err(PlaybackError::FormatMismatch {
                expected: self.sample_rate,
                actual: audio.sample_rate(),
            });
        }

        let Some(now) = self.output.now_frames() else {
            warn!(frames = audio.frames(), "Render clock not running, dropping chunk");
            return Err(PlaybackError::ClockStopped);
        };

        let frames = audio.frames();
        let mut timeline = self.timeline.lock();
        match timeline.first_frame {
            Some(_) if timeline.next_frame >= now => {}
            Some(_) => {
                debug!(
                    gap_frames = now - timeline.next_frame,
                    "Scheduled audio ran out, re-anchoring timeline"
                );
                *timeline = Timeline::anchored_at(now);
            }
            None => {
                trace!(frame = now, "Anchoring timeline");
                *timeline = Timeline::anchored_at(now);
            }
        }
        let at_frame = timeline.next_frame;
        timeline.next_frame += frames;
        timeline.total_frames += frames;
        timeline.last_remaining = timeline.next_frame.saturating_sub(now);

        Ok(Placement {
            output: Arc::clone(&self.output),
            pcm: audio.pcm,
            at_frame,
        })
    }

    /// Placed frames not yet rendered, floored at zero.
    ///
    /// While the render clock is stopped the last computed value is returned.
    pub fn remaining_frames(&self) -> u64 {
        let now = self.output.now_frames();
        let mut timeline = self.timeline.lock();
        let Some(first) = timeline.first_frame else {
            return 0;
        };
        match now {
            Some(now) => {
                let elapsed = now.saturating_sub(first);
                let remaining = timeline.total_frames.saturating_sub(elapsed);
                timeline.last_remaining = remaining;
                remaining
            }
            None => timeline.last_remaining,
        }
    }

    /// [`remaining_frames`](Self::remaining_frames) in seconds.
    pub fn remaining_s(&self) -> f64 {
        self.frames_to_s(self.remaining_frames())
    }

    /// [`remaining_frames`](Self::remaining_frames) as a duration, without
    /// floating-point rounding.
    pub fn remaining(&self) -> Duration {
        self.frames_to_duration(self.remaining_frames())
    }

    /// Frames placed since the timeline was last anchored.
    pub fn total_frames(&self) -> u64 {
        self.timeline.lock().total_frames
    }

    pub fn is_anchored(&self) -> bool {
        self.timeline.lock().first_frame.is_some()
    }

    /// Forgets all placements.
    pub fn reset(&self) {
        *self.timeline.lock() = Timeline::default();
    }

    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(frames) * 1_000_000_000 / u128::from(self.sample_rate);
        Duration::from_nanos(nanos as u64)
    }

    pub fn frames_to_s(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / f64::from(self.sample_rate)
    }
}

/// Audio with a reserved position on the render clock, not yet handed to
/// the output.
#[must_use = "placed audio is silent until rendered"]
pub struct Placement {
    output: Arc<dyn RenderOutput>,
    pcm: PcmBuffer,
    at_frame: u64,
}

impl Placement {
    pub fn at_frame(&self) -> u64 {
        self.at_frame
    }

    pub fn frames(&self) -> u64 {
        self.pcm.frames
    }

    /// Hands the audio to the render output.
    pub fn render(self) {
        self.output.schedule(self.pcm, self.at_frame);
    }
}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placement")
            .field("at_frame", &self.at_frame)
            .field("frames", &self.pcm.frames)
            .finish()
    }
}

impl Timeline {
    fn anchored_at(frame: u64) -> Self {
        Self {
            first_frame: Some(frame),
            next_frame: frame,
            total_frames: 0,
            last_remaining: 0,
        }
    }
}

impl fmt::Debug for PlaybackScheduling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackScheduling")
            .field("sample_rate", &self.sample_rate)
            .field("timeline", &*self.timeline.lock())
            .finish()
    }
}
