//! Listener delivery.
//!
//! Hosts implement [`PlayerListener`] and hand it to [`spawn_listener`],
//! which forwards every [`PlayerEvent`] from the bus on its own task, never
//! on the thread that produced the event.

use std::sync::Arc;

use core_async::task::{self, JoinHandle};
use core_runtime::events::{EventBus, RecvError};
use tracing::{debug, warn};

use crate::error::ErrorSeverity;
use crate::events::PlayerEvent;
use crate::model::{Bouquet, Metadata};
use crate::pipeline::PlaybackState;

/// Receives player notifications. Every method defaults to a no-op.
pub trait PlayerListener: Send + Sync {
    fn state_changed(&self, _state: PlaybackState) {}

    fn metadata_changed(&self, _metadata: &Metadata) {}

    fn offset_to_live_changed(&self, _offset_ms: i64) {}

    fn bit_rate_changed(&self, _current_bps: Option<u32>, _max_bps: Option<u32>) {}

    fn services_changed(&self, _bouquet: &Bouquet) {}

    fn swaps_changed(&self, _swaps: u32) {}

    fn buffer_size(&self, _averaged_s: f64, _current_s: f64) {}

    fn error(&self, _severity: ErrorSeverity, _message: &str) {}
}

/// Calls the listener method matching `event`.
pub fn dispatch(listener: &dyn PlayerListener, event: &PlayerEvent) {
    match event {
        PlayerEvent::StateChanged { state } => listener.state_changed(*state),
        PlayerEvent::MetadataChanged { metadata } => listener.metadata_changed(metadata),
        PlayerEvent::OffsetToLiveChanged { offset_ms } => {
            listener.offset_to_live_changed(*offset_ms)
        }
        PlayerEvent::BitRateChanged {
            current_bps,
            max_bps,
        } => listener.bit_rate_changed(*current_bps, *max_bps),
        PlayerEvent::ServicesChanged { bouquet } => listener.services_changed(bouquet),
        PlayerEvent::SwapsChanged { swaps } => listener.swaps_changed(*swaps),
        PlayerEvent::BufferSize {
            averaged_s,
            current_s,
        } => listener.buffer_size(*averaged_s, *current_s),
        PlayerEvent::Error { severity, message } => listener.error(*severity, message),
    }
}

/// Forwards bus events to `listener` until the bus closes.
///
/// Must be called from within the async runtime.
pub fn spawn_listener(
    bus: &EventBus<PlayerEvent>,
    listener: Arc<dyn PlayerListener>,
) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    task::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => dispatch(listener.as_ref(), &event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Listener fell behind, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed, listener stopped");
                    break;
                }
            }
        }
    })
}
