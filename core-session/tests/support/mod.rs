//! Shared fakes for session tests: a manually advanced render clock at
//! 1 kHz, a cue timer fired by hand and a mocked Ybrid transport.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{BridgeError, PcmBuffer, PcmFormat, RenderOutput};
use core_playback::{CueTimer, ScheduledMarker};
use core_runtime::config::CoreConfig;
use core_session::{
    Item, ItemType, MediaUpdate, Metadata, SessionEndpoint, YbridCommand, YbridResponse,
    YbridTransport,
};
use mockall::mock;
use parking_lot::Mutex;

pub const RATE: u32 = 1_000;

#[derive(Default)]
pub struct FakeOutput {
    now: AtomicU64,
    placed: Mutex<Vec<(u64, u64)>>,
}

impl FakeOutput {
    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn placed_frames(&self) -> u64 {
        self.placed.lock().iter().map(|(_, frames)| frames).sum()
    }
}

impl RenderOutput for FakeOutput {
    fn now_frames(&self) -> Option<u64> {
        Some(self.now.load(Ordering::SeqCst))
    }

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn schedule(&self, pcm: PcmBuffer, at_frame: u64) {
        self.placed.lock().push((at_frame, pcm.frames));
    }
}

#[derive(Default)]
pub struct RecordingTimer {
    armed: Mutex<Vec<(Duration, ScheduledMarker)>>,
}

impl RecordingTimer {
    pub fn delays(&self) -> Vec<Duration> {
        self.armed.lock().iter().map(|(delay, _)| *delay).collect()
    }

    pub fn fire_all(&self) {
        let armed: Vec<_> = self.armed.lock().drain(..).collect();
        for (_, marker) in armed {
            marker.fire();
        }
    }
}

impl CueTimer for RecordingTimer {
    fn fire_after(&self, delay: Duration, marker: ScheduledMarker) {
        self.armed.lock().push((delay, marker));
    }

    fn cancel_pending(&self) {
        let armed: Vec<_> = self.armed.lock().drain(..).collect();
        for (_, marker) in armed {
            marker.discard();
        }
    }
}

mock! {
    pub Transport {}

    #[async_trait]
    impl YbridTransport for Transport {
        async fn request(
            &self,
            command: YbridCommand,
            endpoint: Option<SessionEndpoint>,
        ) -> Result<YbridResponse, BridgeError>;
    }
}

pub fn config(output: Arc<FakeOutput>) -> CoreConfig {
    CoreConfig::builder()
        .render_output(output)
        .update_interval(Duration::from_millis(10))
        .build()
        .expect("valid core config")
}

pub fn audio_ms(ms: u64) -> PcmBuffer {
    PcmBuffer::silence(ms, PcmFormat::new(RATE, 1))
}

pub fn song(id: &str, title: &str) -> Metadata {
    Metadata::default().with_current(Item::new(id, ItemType::Music).with_title(title))
}

pub fn endpoint() -> SessionEndpoint {
    SessionEndpoint::new("session-token", "https://edge.example.com/ctrl/v2")
}

/// Transport answering `CreateSession` with an endpoint, three swaps and
/// song "a".
pub fn connecting_transport() -> MockTransport {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|command, _| *command == YbridCommand::CreateSession)
        .times(1)
        .returning(|_, _| {
            Ok(YbridResponse::accepted(MediaUpdate {
                endpoint: Some(endpoint()),
                metadata: Some(song("a", "First")),
                swaps: Some(3),
                ..Default::default()
            }))
        });
    transport
}
