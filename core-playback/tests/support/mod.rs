//! Deterministic collaborators for buffer tests.
//!
//! The render clock runs at 1 kHz so one frame is one millisecond.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{PcmBuffer, PcmFormat, RenderOutput};
use core_async::sync::mpsc;
use core_playback::{
    BufferConfig, CueEvent, CueTimer, PlaybackBuffer, PlaybackScheduling, ScheduledMarker,
};
use parking_lot::Mutex;

pub const RATE: u32 = 1_000;

/// Render output whose clock only moves when told to.
#[derive(Default)]
pub struct FakeOutput {
    now: AtomicU64,
    stopped: AtomicBool,
    placed: Mutex<Vec<(u64, u64)>>,
}

impl FakeOutput {
    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_running(&self, running: bool) {
        self.stopped.store(!running, Ordering::SeqCst);
    }

    /// `(at_frame, frames)` of every scheduled buffer, in call order.
    pub fn placed(&self) -> Vec<(u64, u64)> {
        self.placed.lock().clone()
    }

    pub fn placed_frames(&self) -> u64 {
        self.placed.lock().iter().map(|(_, frames)| frames).sum()
    }
}

impl RenderOutput for FakeOutput {
    fn now_frames(&self) -> Option<u64> {
        if self.stopped.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.now.load(Ordering::SeqCst))
        }
    }

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn schedule(&self, pcm: PcmBuffer, at_frame: u64) {
        self.placed.lock().push((at_frame, pcm.frames));
    }
}

/// Cue timer that holds armed markers until the test fires them.
#[derive(Default)]
pub struct RecordingTimer {
    armed: Mutex<Vec<(Duration, ScheduledMarker)>>,
    cancellations: AtomicU64,
}

impl RecordingTimer {
    pub fn delays(&self) -> Vec<Duration> {
        self.armed.lock().iter().map(|(delay, _)| *delay).collect()
    }

    pub fn armed_len(&self) -> usize {
        self.armed.lock().len()
    }

    /// Fires every armed marker in arming order.
    pub fn fire_all(&self) {
        let armed: Vec<_> = self.armed.lock().drain(..).collect();
        for (_, marker) in armed {
            marker.fire();
        }
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl CueTimer for RecordingTimer {
    fn fire_after(&self, delay: Duration, marker: ScheduledMarker) {
        self.armed.lock().push((delay, marker));
    }

    fn cancel_pending(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        let armed: Vec<_> = self.armed.lock().drain(..).collect();
        for (_, marker) in armed {
            marker.discard();
        }
    }
}

pub struct Harness {
    pub output: Arc<FakeOutput>,
    pub timer: Arc<RecordingTimer>,
    pub buffer: PlaybackBuffer,
    pub cues: mpsc::UnboundedReceiver<CueEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    pub fn with_config(config: BufferConfig) -> Self {
        let output = Arc::new(FakeOutput::default());
        let timer = Arc::new(RecordingTimer::default());
        let (cue_tx, cues) = mpsc::unbounded_channel();
        let scheduling = Arc::new(PlaybackScheduling::new(output.clone()));
        let buffer = PlaybackBuffer::new(config, scheduling, timer.clone(), cue_tx)
            .expect("valid buffer config");
        Self {
            output,
            timer,
            buffer,
            cues,
        }
    }

    pub fn drain_cues(&mut self) -> Vec<CueEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.cues.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Mono silence lasting `ms` milliseconds.
pub fn audio_ms(ms: u64) -> PcmBuffer {
    PcmBuffer::silence(ms, PcmFormat::new(RATE, 1))
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
