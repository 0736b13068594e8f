//! # Playback Pipeline
//!
//! Connects the decoder output, the playback buffer and the session.
//!
//! - Decoded PCM goes straight into the buffer.
//! - Metadata is queued as a cue point at its position in the audio. If it
//!   resolves the session's awaited change-over, the change-over's completion
//!   is queued right behind the cue, so "done" fires when the new content is
//!   audible.
//! - A reached cue folds its metadata into the session and notifies
//!   listeners.
//! - A periodic updater drives the buffer state machine and reports buffer
//!   level and playback state.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bridge_traits::{PcmBuffer, RenderOutput};
use core_async::runtime::Handle;
use core_async::sync::{mpsc, CancellationToken, ConcurrentMap};
use core_async::task::{self, JoinHandle};
use core_async::time;
use core_playback::{
    AudioChunk, BufferConfig, BufferState, CueEvent, CuePoint, CueTimer, PlaybackBuffer,
    PlaybackScheduling, TokioCueTimer,
};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::events::PlayerEvent;
use crate::model::Metadata;
use crate::session::MediaSession;

/// Playback state reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Buffering,
    Playing,
    Pausing,
}

impl From<BufferState> for PlaybackState {
    fn from(state: BufferState) -> Self {
        match state {
            BufferState::Empty => PlaybackState::Buffering,
            BufferState::Ready => PlaybackState::Playing,
            BufferState::Wait => PlaybackState::Pausing,
        }
    }
}

struct Inner {
    buffer: PlaybackBuffer,
    output: Arc<dyn RenderOutput>,
    session: Arc<MediaSession>,
    cues: ConcurrentMap<Uuid, Metadata>,
    state: Mutex<PlaybackState>,
}

/// Playback side of one session.
pub struct PlaybackPipeline {
    inner: Arc<Inner>,
    runtime: Handle,
    update_interval: Duration,
    updater: Mutex<Option<CancellationToken>>,
    cue_consumer: JoinHandle<()>,
}

impl PlaybackPipeline {
    /// Builds a pipeline whose markers fire on runtime timers.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Internal`] when called outside the async runtime
    /// - [`SessionError::Playback`] when `buffer_config` is invalid
    pub fn new(
        config: &CoreConfig,
        buffer_config: BufferConfig,
        session: Arc<MediaSession>,
    ) -> Result<Self> {
        let timer = TokioCueTimer::from_current().ok_or_else(no_runtime)?;
        Self::with_timer(config, buffer_config, session, Arc::new(timer))
    }

    /// Builds a pipeline firing markers through `timer`.
    pub fn with_timer(
        config: &CoreConfig,
        buffer_config: BufferConfig,
        session: Arc<MediaSession>,
        timer: Arc<dyn CueTimer>,
    ) -> Result<Self> {
        let runtime = core_async::runtime::current_handle().ok_or_else(no_runtime)?;
        let output = Arc::clone(&config.render_output);
        let (cue_tx, cue_rx) = mpsc::unbounded_channel();
        let scheduling = Arc::new(PlaybackScheduling::new(Arc::clone(&output)));
        let buffer = PlaybackBuffer::new(buffer_config, scheduling, timer, cue_tx)?;

        let inner = Arc::new(Inner {
            buffer,
            output,
            session,
            cues: ConcurrentMap::new(),
            state: Mutex::new(PlaybackState::Buffering),
        });
        let cue_consumer = task::spawn_on(&runtime, consume_cues(Arc::downgrade(&inner), cue_rx));

        Ok(Self {
            inner,
            runtime,
            update_interval: config.update_interval,
            updater: Mutex::new(None),
            cue_consumer,
        })
    }

    pub fn session(&self) -> &Arc<MediaSession> {
        &self.inner.session
    }

    pub fn buffer(&self) -> &PlaybackBuffer {
        &self.inner.buffer
    }

    pub fn state(&self) -> PlaybackState {
        *self.inner.state.lock()
    }

    /// Queues decoded audio.
    pub fn on_pcm(&self, pcm: PcmBuffer, timestamp: Option<Duration>) -> Result<()> {
        let mut chunk = AudioChunk::new(pcm);
        if let Some(timestamp) = timestamp {
            chunk = chunk.with_timestamp(timestamp);
        }
        self.inner.buffer.put(chunk)?;
        Ok(())
    }

    /// Queues `metadata` at the current end of the buffered audio.
    pub fn on_metadata(&self, metadata: Metadata) -> Result<()> {
        let completion = self.inner.session.on_metadata(&metadata);

        let cue = CuePoint::new();
        self.inner.cues.put(cue.id, metadata);
        trace!(cue = %cue.id, "Queued metadata cue");
        self.inner.buffer.put(cue)?;

        if let Some(completion) = completion {
            self.inner.buffer.put(completion)?;
        }
        Ok(())
    }

    /// Discards buffered audio and re-targets the scheduler to the output's
    /// new format.
    pub fn on_format_changed(&self) {
        self.inner.buffer.reset();
        let scheduling = PlaybackScheduling::new(Arc::clone(&self.inner.output));
        info!(sample_rate = scheduling.sample_rate(), "Output format changed");
        self.inner.buffer.replace_scheduling(Arc::new(scheduling));
        self.inner.publish_state();
    }

    /// Runs one buffer evaluation and reports the buffer level.
    pub fn update(&self) -> f64 {
        self.inner.update()
    }

    pub fn pause(&self) {
        self.inner.buffer.pause();
        self.inner.publish_state();
    }

    pub fn resume(&self) {
        self.inner.buffer.resume();
        self.inner.publish_state();
    }

    pub fn end_of_stream(&self) {
        self.inner.buffer.end_of_stream();
        self.inner.publish_state();
    }

    /// Starts calling [`update`](Self::update) every update interval.
    /// Does nothing when the updater already runs.
    pub fn spawn_updater(&self) {
        let mut updater = self.updater.lock();
        if updater.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let inner = Arc::downgrade(&self.inner);
        let period = self.update_interval;
        let cancelled = token.clone();

        task::spawn_on(&self.runtime, async move {
            let mut ticker = time::steady_interval(period);
            loop {
                core_async::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else { break };
                        inner.update();
                    }
                }
            }
            debug!("Buffer updater stopped");
        });
        *updater = Some(token);
        debug!(period_ms = period.as_millis() as u64, "Buffer updater started");
    }

    /// Stops updating, discards all content and fails the awaited change-over.
    pub fn stop(&self) {
        if let Some(token) = self.updater.lock().take() {
            token.cancel();
        }
        self.inner.buffer.dispose();
        self.inner.session.close();
        self.inner.set_state(PlaybackState::Stopped);
        info!("Playback stopped");
    }
}

impl Inner {
    fn update(&self) -> f64 {
        let current_s = self.buffer.update();
        let level = self.buffer.level();
        self.session
            .events()
            .emit(PlayerEvent::BufferSize {
                averaged_s: level.averaged_s,
                current_s,
            })
            .ok();
        self.publish_state();
        current_s
    }

    fn publish_state(&self) {
        if self.buffer.is_disposed() {
            return;
        }
        self.set_state(self.buffer.state().into());
    }

    fn set_state(&self, next: PlaybackState) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            *state = next;
        }
        debug!(state = ?next, "Playback state changed");
        self.session
            .events()
            .emit(PlayerEvent::StateChanged { state: next })
            .ok();
    }

    fn on_cue(&self, event: CueEvent) {
        let Some(metadata) = self.cues.pop(&event.id) else {
            return;
        };
        if event.reached {
            trace!(cue = %event.id, "Metadata became audible");
            self.session.on_audible_metadata(metadata);
        }
    }
}

async fn consume_cues(inner: Weak<Inner>, mut cues: mpsc::UnboundedReceiver<CueEvent>) {
    while let Some(event) = cues.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_cue(event);
    }
}

fn no_runtime() -> SessionError {
    SessionError::Internal("playback pipeline must be created inside the async runtime".into())
}

impl Drop for PlaybackPipeline {
    fn drop(&mut self) {
        if let Some(token) = self.updater.lock().take() {
            token.cancel();
        }
        self.cue_consumer.abort();
    }
}

impl fmt::Debug for PlaybackPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackPipeline")
            .field("state", &self.state())
            .field("buffer", &self.inner.buffer)
            .field("pending_cues", &self.inner.cues.len())
            .finish()
    }
}
