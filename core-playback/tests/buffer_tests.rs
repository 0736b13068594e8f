//! Buffering state machine tests against a manually advanced render clock.

mod support;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use bridge_traits::{PcmBuffer, RenderOutput};
use core_async::sync::mpsc;
use core_playback::{
    BufferConfig, BufferState, Completion, CueEvent, CuePoint, PlaybackBuffer, PlaybackError,
    PlaybackScheduling,
};
use support::{approx, audio_ms, FakeOutput, Harness, RecordingTimer, RATE};

#[test]
fn starts_only_once_pre_buffer_threshold_is_reached() {
    let h = Harness::new();

    h.buffer.put(audio_ms(300)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Empty);
    assert!(h.output.placed().is_empty());

    h.buffer.put(audio_ms(300)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);
    assert!(h.output.placed_frames() >= 500);
    assert_eq!(h.output.placed(), vec![(0, 300), (300, 300)]);
}

#[test]
fn low_scheduling_triggers_refill_and_stays_ready() {
    let h = Harness::new();
    h.buffer.put(audio_ms(800)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);

    for _ in 0..10 {
        h.buffer.put(audio_ms(100)).unwrap();
    }
    // 0.8 s scheduled is above the watermark, nothing more was handed over.
    assert_eq!(h.output.placed_frames(), 800);
    assert!(approx(h.buffer.buffered_s(), 1.0));

    h.output.advance_ms(400);
    assert!(approx(h.buffer.scheduled_s(), 0.4));

    h.buffer.update();

    assert_eq!(h.buffer.state(), BufferState::Ready);
    assert!(h.output.placed_frames() - 800 >= 500);
    assert!(h.buffer.scheduled_s() >= 0.9 - 1e-9);
}

#[test]
fn drained_buffer_rebuffers_with_raised_threshold() {
    let h = Harness::new();
    h.buffer.put(audio_ms(600)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);

    h.output.advance_ms(600);
    h.buffer.update();

    assert_eq!(h.buffer.state(), BufferState::Empty);
    assert!(approx(h.buffer.threshold_s(), 1.5));
    assert_eq!(h.buffer.stats().underruns, 1);

    h.buffer.put(audio_ms(1_000)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Empty);

    h.buffer.put(audio_ms(500)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);
}

#[test]
fn repeated_updates_without_input_change_state_once() {
    let h = Harness::new();
    h.buffer.put(audio_ms(600)).unwrap();
    h.output.advance_ms(1_000);

    for _ in 0..5 {
        h.buffer.update();
        assert_eq!(h.buffer.state(), BufferState::Empty);
    }
    assert_eq!(h.buffer.stats().underruns, 1);
}

#[test]
fn markers_are_armed_after_the_audio_in_front_of_them() {
    let h = Harness::new();
    let cue = CuePoint::new();
    let (done, mut handle) = Completion::new();

    h.buffer.put(audio_ms(300)).unwrap();
    h.buffer.put(cue).unwrap();
    h.buffer.put(audio_ms(300)).unwrap();
    h.buffer.put(done).unwrap();

    assert_eq!(
        h.timer.delays(),
        vec![Duration::from_millis(300), Duration::from_millis(600)]
    );
    assert_eq!(handle.try_result(), None);

    h.timer.fire_all();
    assert_eq!(handle.try_result(), Some(true));
}

#[test]
fn chunks_leave_in_arrival_order() {
    let h = Harness::new();
    for ms in [100, 200, 300, 400] {
        h.buffer.put(audio_ms(ms)).unwrap();
    }
    h.output.advance_ms(1_000);
    h.buffer.update();
    h.buffer.put(audio_ms(1_500)).unwrap();
    h.buffer.put(audio_ms(50)).unwrap();

    let frames: Vec<u64> = h.output.placed().iter().map(|(_, f)| *f).collect();
    assert_eq!(frames, vec![100, 200, 300, 400, 1_500]);
    let starts: Vec<u64> = h.output.placed().iter().map(|(at, _)| *at).collect();
    assert_eq!(starts, vec![0, 100, 300, 600, 1_000]);
}

#[test]
fn buffered_plus_scheduled_tracks_unplayed_audio() {
    let h = Harness::new();
    h.buffer.put(audio_ms(700)).unwrap();
    h.buffer.put(audio_ms(900)).unwrap();
    h.output.advance_ms(250);

    let level = h.buffer.update();
    assert!(approx(level, 1.6 - 0.25));
    assert!(approx(h.buffer.level().current_s, level));
}

#[test]
fn reset_settles_every_marker_negatively() {
    let mut h = Harness::new();
    let armed_cue = CuePoint::new();
    let queued_cue = CuePoint::new();
    let (armed_done, mut armed_handle) = Completion::new();
    let (queued_done, mut queued_handle) = Completion::new();

    h.buffer.put(audio_ms(600)).unwrap();
    h.buffer.put(armed_cue).unwrap();
    h.buffer.put(armed_done).unwrap();
    assert_eq!(h.timer.armed_len(), 2);

    h.output.advance_ms(300);
    h.buffer.put(audio_ms(100)).unwrap();
    h.buffer.pause();
    h.buffer.put(audio_ms(100)).unwrap();
    h.buffer.put(queued_cue).unwrap();
    h.buffer.put(queued_done).unwrap();

    h.buffer.reset();

    assert_eq!(armed_handle.try_result(), Some(false));
    assert_eq!(queued_handle.try_result(), Some(false));
    let mut events = h.drain_cues();
    events.sort_by_key(|e| e.id);
    let mut expected = vec![
        CueEvent {
            id: armed_cue.id,
            reached: false,
        },
        CueEvent {
            id: queued_cue.id,
            reached: false,
        },
    ];
    expected.sort_by_key(|e| e.id);
    assert_eq!(events, expected);

    assert!(h.buffer.is_empty());
    assert_eq!(h.buffer.state(), BufferState::Empty);
    assert!(approx(h.buffer.threshold_s(), 0.5));
    assert_eq!(h.buffer.scheduled_s(), 0.0);
    assert_eq!(h.timer.cancellations(), 1);
}

#[test]
fn dispose_rejects_further_content() {
    let h = Harness::new();
    let (queued, mut queued_handle) = Completion::new();
    h.buffer.put(queued).unwrap();

    h.buffer.dispose();
    assert_eq!(queued_handle.try_result(), Some(false));

    let (late, mut late_handle) = Completion::new();
    assert_eq!(h.buffer.put(late), Err(PlaybackError::Disposed));
    assert_eq!(late_handle.try_result(), Some(false));
    assert_eq!(h.buffer.put(audio_ms(10)), Err(PlaybackError::Disposed));
}

#[test]
fn pause_suspends_and_resume_continues() {
    let h = Harness::new();
    h.buffer.pause();
    h.buffer.put(audio_ms(800)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Wait);
    assert!(h.output.placed().is_empty());

    h.buffer.resume();
    assert_eq!(h.buffer.state(), BufferState::Ready);
    assert_eq!(h.output.placed_frames(), 800);
}

#[test]
fn end_of_stream_plays_out_partial_buffer() {
    let h = Harness::new();
    h.buffer.put(audio_ms(200)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Empty);

    h.buffer.end_of_stream();
    assert_eq!(h.buffer.state(), BufferState::Ready);
    assert_eq!(h.output.placed_frames(), 200);
}

#[test]
fn stopped_render_clock_holds_content() {
    let h = Harness::new();
    h.output.set_running(false);
    h.buffer.put(audio_ms(800)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Empty);
    assert!(approx(h.buffer.buffered_s(), 0.8));

    h.output.set_running(true);
    h.buffer.update();
    assert_eq!(h.buffer.state(), BufferState::Ready);
}

#[test]
fn stopped_render_clock_keeps_reporting_scheduled_audio() {
    let h = Harness::new();
    h.buffer.put(audio_ms(800)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);

    h.output.set_running(false);

    assert_eq!(h.buffer.state(), BufferState::Ready);
    assert!(approx(h.buffer.scheduled_s(), 0.8));
    assert!(approx(h.buffer.update(), 0.8));
}

/// Resets the buffer from inside its first `schedule` call.
#[derive(Default)]
struct ResettingOutput {
    clock: FakeOutput,
    buffer: OnceLock<Weak<PlaybackBuffer>>,
    calls: AtomicU64,
}

impl RenderOutput for ResettingOutput {
    fn now_frames(&self) -> Option<u64> {
        self.clock.now_frames()
    }

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn schedule(&self, pcm: PcmBuffer, at_frame: u64) {
        self.clock.schedule(pcm, at_frame);
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(buffer) = self.buffer.get().and_then(Weak::upgrade) {
                buffer.reset();
            }
        }
    }
}

#[test]
fn render_output_may_reset_buffer_from_schedule() {
    let output = Arc::new(ResettingOutput::default());
    let timer = Arc::new(RecordingTimer::default());
    let (cue_tx, mut cues) = mpsc::unbounded_channel();
    let scheduling = Arc::new(PlaybackScheduling::new(output.clone()));
    let buffer = Arc::new(
        PlaybackBuffer::new(BufferConfig::default(), scheduling, timer.clone(), cue_tx).unwrap(),
    );
    output.buffer.set(Arc::downgrade(&buffer)).unwrap();

    let cue = CuePoint::new();
    let cue_id = cue.id;
    buffer.put(audio_ms(300)).unwrap();
    buffer.put(cue).unwrap();
    buffer.put(audio_ms(300)).unwrap();

    // The reset ran inside the first render; the rest of the pass was dropped.
    assert_eq!(output.clock.placed(), vec![(0, 300)]);
    assert_eq!(buffer.state(), BufferState::Empty);
    assert!(buffer.is_empty());
    assert!(!buffer.scheduling().is_anchored());
    assert_eq!(timer.cancellations(), 1);
    assert_eq!(timer.armed_len(), 0);

    let event = cues.try_recv().unwrap();
    assert_eq!(event.id, cue_id);
    assert!(!event.reached);
}

#[test]
fn trailing_markers_fire_when_buffer_drains() {
    let h = Harness::new();
    h.buffer.put(audio_ms(600)).unwrap();
    h.buffer.pause();
    let (done, mut handle) = Completion::new();
    h.buffer.put(done).unwrap();
    h.buffer.resume();
    // Scheduled audio is at the watermark, so the marker was armed on resume.
    assert_eq!(h.timer.delays(), vec![Duration::from_millis(600)]);

    h.output.advance_ms(600);
    h.buffer.update();
    h.timer.fire_all();
    assert_eq!(handle.try_result(), Some(true));
    assert_eq!(h.buffer.state(), BufferState::Empty);
}

#[test]
fn low_latency_preset_starts_earlier() {
    let h = Harness::with_config(BufferConfig::low_latency());
    h.buffer.put(audio_ms(300)).unwrap();
    assert_eq!(h.buffer.state(), BufferState::Ready);
}

#[test]
fn invalid_config_is_rejected() {
    use core_playback::PlaybackBuffer;
    use std::sync::Arc;

    let output = Arc::new(support::FakeOutput::default());
    let scheduling = Arc::new(core_playback::PlaybackScheduling::new(output));
    let (tx, _rx) = core_async::sync::mpsc::unbounded_channel();
    let config = BufferConfig {
        heal_target_s: 0.0,
        ..Default::default()
    };
    let result = PlaybackBuffer::new(
        config,
        scheduling,
        Arc::new(support::RecordingTimer::default()),
        tx,
    );
    assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
}
