//! # Playback Buffer
//!
//! FIFO of decoded audio and markers in front of the render-clock scheduler.
//!
//! ## State machine
//!
//! | State | Condition | Action |
//! |-------|-----------|--------|
//! | `Empty` | nothing scheduled, buffered ≥ threshold | hand ≥ heal target to the scheduler, go `Ready` |
//! | `Ready` | buffered + scheduled drained to 0 | reset scheduler, raise threshold to the re-buffer value, go `Empty` |
//! | `Ready` | scheduled ≤ low watermark, content queued | hand ≥ heal target to the scheduler |
//! | `Wait`  | any | nothing |
//!
//! The threshold starts at the pre-buffer value and is only raised after an
//! underrun.
//!
//! ## Concurrency
//!
//! `put` is called from decode callbacks and `update` from a timer while the
//! session may reset the buffer. Evaluation is serialized through an internal
//! pass that is only *tried*: a caller finding it taken flags a re-run for the
//! current holder and returns immediately, so producers never wait on the
//! scheduler. Audio placed during a pass reaches the host render output only
//! after the pass is released, so the host may call back into the buffer.
//! Placements made stale by a concurrent reset are dropped. Markers are
//! settled through channels only.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_async::sync::{mpsc, ConcurrentQueue};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::chunk::Chunk;
use crate::config::BufferConfig;
use crate::cue::{CueEvent, CueTimer, ScheduledMarker};
use crate::error::{PlaybackError, Result};
use crate::metrics::{BufferLevel, BufferMetrics, BufferStats, StatsCounters};
use crate::scheduling::{PlaybackScheduling, Placement};

/// Buffering state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferState {
    /// Accumulating until the threshold is reached.
    Empty,
    /// Feeding the scheduler.
    Ready,
    /// Suspended by an explicit pause.
    Wait,
}

#[derive(Debug, Clone, Copy)]
struct Control {
    state: BufferState,
    threshold_s: f64,
}

/// Buffer of chunks waiting to be scheduled.
pub struct PlaybackBuffer {
    config: BufferConfig,
    queue: ConcurrentQueue<Chunk>,
    scheduling: RwLock<Arc<PlaybackScheduling>>,
    timer: Arc<dyn CueTimer>,
    cues: mpsc::UnboundedSender<CueEvent>,
    control: Mutex<Control>,
    pass: Mutex<()>,
    rerun: AtomicBool,
    /// Bumped by every reset; tags placements awaiting render.
    generation: AtomicU64,
    disposed: AtomicBool,
    metrics: BufferMetrics,
    stats: StatsCounters,
}

impl PlaybackBuffer {
    /// Creates an empty buffer.
    ///
    /// Cue points reaching the render clock (or being discarded) are reported
    /// on `cues`.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidConfig`] when `config` does not validate.
    pub fn new(
        config: BufferConfig,
        scheduling: Arc<PlaybackScheduling>,
        timer: Arc<dyn CueTimer>,
        cues: mpsc::UnboundedSender<CueEvent>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            metrics: BufferMetrics::new(Duration::from_secs_f64(config.averaging_window_s)),
            control: Mutex::new(Control {
                state: BufferState::Empty,
                threshold_s: config.pre_buffer_s,
            }),
            config,
            queue: ConcurrentQueue::new(),
            scheduling: RwLock::new(scheduling),
            timer,
            cues,
            pass: Mutex::new(()),
            rerun: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            stats: StatsCounters::default(),
        })
    }

    /// Appends audio or a marker and re-evaluates.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Disposed`] after [`dispose`](Self::dispose); a marker
    /// passed in is settled negatively before returning.
    pub fn put(&self, chunk: impl Into<Chunk>) -> Result<()> {
        let chunk = chunk.into();
        if self.is_disposed() {
            self.discard(chunk);
            return Err(PlaybackError::Disposed);
        }

        self.queue.put(chunk);

        if self.is_disposed() {
            // Lost a race with dispose(); settle whatever slipped in.
            self.discard_queued();
            return Err(PlaybackError::Disposed);
        }

        self.evaluate();
        Ok(())
    }

    /// Re-evaluates and returns buffered plus scheduled seconds.
    pub fn update(&self) -> f64 {
        self.evaluate();
        let level = self.buffered_s() + self.scheduled_s();
        self.metrics.record(level);
        level
    }

    /// Suspends all scheduling decisions. Content is kept.
    pub fn pause(&self) {
        let mut control = self.control.lock();
        if control.state != BufferState::Wait {
            debug!(from = ?control.state, "Buffer paused");
            control.state = BufferState::Wait;
        }
    }

    /// Leaves [`BufferState::Wait`] for [`BufferState::Ready`].
    pub fn resume(&self) {
        {
            let mut control = self.control.lock();
            if control.state != BufferState::Wait {
                return;
            }
            control.state = BufferState::Ready;
        }
        debug!("Buffer resumed");
        self.evaluate();
    }

    /// Lowers the threshold to zero so the remaining audio plays out.
    pub fn end_of_stream(&self) {
        self.control.lock().threshold_s = 0.0;
        debug!("End of stream, threshold lowered to 0");
        self.evaluate();
    }

    /// Discards all content.
    ///
    /// Every queued marker and every marker still waiting on the cue timer is
    /// settled negatively before this returns. The scheduler is reset, the
    /// state returns to `Empty` and the threshold to the pre-buffer value.
    pub fn reset(&self) {
        {
            let _pass = self.pass.lock();
            self.generation.fetch_add(1, Ordering::AcqRel);
            self.discard_queued();
            self.timer.cancel_pending();
            self.scheduling().reset();
            *self.control.lock() = Control {
                state: BufferState::Empty,
                threshold_s: self.config.pre_buffer_s,
            };
            self.metrics.clear();
        }
        debug!("Buffer reset");

        if !self.is_disposed() {
            self.evaluate();
        }
    }

    /// Resets and refuses further content.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.reset();
        info!("Buffer disposed");
    }

    /// Swaps in a scheduler for a new output format. Call after [`reset`](Self::reset).
    pub fn replace_scheduling(&self, scheduling: Arc<PlaybackScheduling>) {
        let _pass = self.pass.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!(sample_rate = scheduling.sample_rate(), "Scheduling replaced");
        *self.scheduling.write() = scheduling;
    }

    pub fn scheduling(&self) -> Arc<PlaybackScheduling> {
        Arc::clone(&self.scheduling.read())
    }

    pub fn state(&self) -> BufferState {
        self.control.lock().state
    }

    pub fn threshold_s(&self) -> f64 {
        self.control.lock().threshold_s
    }

    /// Seconds of audio queued but not yet handed to the scheduler.
    pub fn buffered_s(&self) -> f64 {
        self.queue.fold(0.0, |total, chunk| total + chunk.duration_s())
    }

    /// Seconds handed to the scheduler and not yet rendered.
    pub fn scheduled_s(&self) -> f64 {
        self.scheduling().remaining_s()
    }

    /// Queued chunks, markers included.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Current and averaged level from the readings taken by `update`.
    pub fn level(&self) -> BufferLevel {
        self.metrics.level()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats.snapshot()
    }

    fn evaluate(&self) {
        self.rerun.store(true, Ordering::Release);
        while self.rerun.load(Ordering::Acquire) {
            let (generation, placements) = {
                let Some(_pass) = self.pass.try_lock() else {
                    trace!("Evaluation in progress, deferring");
                    return;
                };
                let mut placements = Vec::new();
                while self.rerun.swap(false, Ordering::AcqRel) {
                    self.evaluate_once(&mut placements);
                }
                (self.generation.load(Ordering::Acquire), placements)
            };
            self.render(generation, placements);
        }
    }

    fn render(&self, generation: u64, placements: Vec<Placement>) {
        for placement in placements {
            if self.generation.load(Ordering::Acquire) != generation {
                debug!(at_frame = placement.at_frame(), "Dropping placement made stale by reset");
                continue;
            }
            placement.render();
        }
    }

    fn evaluate_once(&self, placements: &mut Vec<Placement>) {
        let Control { state, threshold_s } = *self.control.lock();
        if state == BufferState::Wait {
            return;
        }

        let scheduling = self.scheduling();
        if !scheduling.clock_running() {
            trace!("Render clock stopped, skipping evaluation");
            return;
        }

        let buffered = self.buffered_s();
        let scheduled = scheduling.remaining_s();
        let has_content = !self.queue.is_empty();

        match state {
            BufferState::Empty => {
                if scheduled <= 0.0 && has_content && buffered >= threshold_s {
                    let handed = self.heal(&scheduling, placements);
                    if self.transition(BufferState::Empty, BufferState::Ready, None) {
                        info!(buffered_s = buffered, handed_s = handed, "Buffer ready");
                    }
                }
            }
            BufferState::Ready => {
                if buffered + scheduled <= 0.0 {
                    self.flush_markers(&scheduling, placements);
                    scheduling.reset();
                    let re_buffer = self.config.re_buffer_s;
                    if self.transition(BufferState::Ready, BufferState::Empty, Some(re_buffer)) {
                        self.stats.underrun();
                        warn!(threshold_s = re_buffer, "Buffer underrun");
                    }
                } else if scheduled <= self.config.low_watermark_s && has_content {
                    let handed = self.heal(&scheduling, placements);
                    trace!(scheduled_s = scheduled, handed_s = handed, "Refilled scheduler");
                }
            }
            BufferState::Wait => {}
        }
    }

    /// Applies `from -> to` unless the state changed concurrently (pause, reset).
    fn transition(&self, from: BufferState, to: BufferState, threshold_s: Option<f64>) -> bool {
        let mut control = self.control.lock();
        if control.state != from {
            return false;
        }
        control.state = to;
        if let Some(threshold_s) = threshold_s {
            control.threshold_s = threshold_s;
        }
        true
    }

    /// Hands at least the heal target to the scheduler, plus any markers
    /// directly following it. Returns the seconds of audio handed over.
    fn heal(&self, scheduling: &PlaybackScheduling, placements: &mut Vec<Placement>) -> f64 {
        let mut handed = 0.0;
        while handed < self.config.heal_target_s {
            let Some(chunk) = self.queue.take() else {
                break;
            };
            match self.schedule_chunk(chunk, scheduling, placements) {
                Ok(seconds) => handed += seconds,
                Err(PlaybackError::ClockStopped) => break,
                Err(err) => warn!(error = %err, "Dropping chunk"),
            }
        }
        self.flush_markers(scheduling, placements);
        handed
    }

    fn flush_markers(&self, scheduling: &PlaybackScheduling, placements: &mut Vec<Placement>) {
        while let Some(marker) = self.queue.take_if(Chunk::is_marker) {
            // Markers never fail to schedule.
            let _ = self.schedule_chunk(marker, scheduling, placements);
        }
    }

    fn schedule_chunk(
        &self,
        chunk: Chunk,
        scheduling: &PlaybackScheduling,
        placements: &mut Vec<Placement>,
    ) -> Result<f64> {
        match chunk {
            Chunk::Audio(audio) => {
                let placement = scheduling.place(audio)?;
                let frames = placement.frames();
                placements.push(placement);
                self.stats.chunk_scheduled();
                Ok(scheduling.frames_to_s(frames))
            }
            Chunk::Cue(point) => {
                self.arm(
                    ScheduledMarker::Cue {
                        point,
                        sink: self.cues.clone(),
                    },
                    scheduling,
                );
                Ok(0.0)
            }
            Chunk::Completion(completion) => {
                self.arm(ScheduledMarker::Completion(completion), scheduling);
                Ok(0.0)
            }
        }
    }

    /// Fires `marker` once everything scheduled before it has been rendered.
    fn arm(&self, marker: ScheduledMarker, scheduling: &PlaybackScheduling) {
        let delay = scheduling.remaining();
        trace!(?marker, delay_ms = delay.as_millis() as u64, "Arming marker");
        self.stats.marker_armed();
        self.timer.fire_after(delay, marker);
    }

    fn discard_queued(&self) {
        for chunk in self.queue.drain() {
            self.discard(chunk);
        }
    }

    fn discard(&self, chunk: Chunk) {
        let marker = match chunk {
            Chunk::Audio(_) => return,
            Chunk::Cue(point) => ScheduledMarker::Cue {
                point,
                sink: self.cues.clone(),
            },
            Chunk::Completion(completion) => ScheduledMarker::Completion(completion),
        };
        self.stats.marker_discarded();
        marker.discard();
    }
}

impl Drop for PlaybackBuffer {
    fn drop(&mut self) {
        self.discard_queued();
    }
}

impl fmt::Debug for PlaybackBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = *self.control.lock();
        f.debug_struct("PlaybackBuffer")
            .field("state", &control.state)
            .field("threshold_s", &control.threshold_s)
            .field("queued", &self.queue.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
