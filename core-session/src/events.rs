//! Events delivered to player listeners.

use core_runtime::events::{BusEvent, EventSeverity};
use serde::{Deserialize, Serialize};

use crate::error::ErrorSeverity;
use crate::model::{Bouquet, Metadata};
use crate::pipeline::PlaybackState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PlayerEvent {
    StateChanged {
        state: PlaybackState,
    },
    MetadataChanged {
        metadata: Metadata,
    },
    OffsetToLiveChanged {
        offset_ms: i64,
    },
    BitRateChanged {
        current_bps: Option<u32>,
        max_bps: Option<u32>,
    },
    ServicesChanged {
        bouquet: Bouquet,
    },
    SwapsChanged {
        swaps: u32,
    },
    BufferSize {
        averaged_s: f64,
        current_s: f64,
    },
    Error {
        severity: ErrorSeverity,
        message: String,
    },
}

impl BusEvent for PlayerEvent {
    fn description(&self) -> String {
        match self {
            PlayerEvent::StateChanged { state } => format!("Playback state changed to {:?}", state),
            PlayerEvent::MetadataChanged { metadata } => match metadata.current_title() {
                Some(title) => format!("Now playing: {}", title),
                None => "Metadata changed".to_string(),
            },
            PlayerEvent::OffsetToLiveChanged { offset_ms } => {
                format!("Offset to live changed to {} ms", offset_ms)
            }
            PlayerEvent::BitRateChanged {
                current_bps,
                max_bps,
            } => format!(
                "Bit-rate changed (current: {:?}, max: {:?})",
                current_bps, max_bps
            ),
            PlayerEvent::ServicesChanged { bouquet } => {
                format!("Services changed, active: {}", bouquet.active)
            }
            PlayerEvent::SwapsChanged { swaps } => format!("{} swaps left", swaps),
            PlayerEvent::BufferSize {
                averaged_s,
                current_s,
            } => format!(
                "Buffer at {:.2}s (average {:.2}s)",
                current_s, averaged_s
            ),
            PlayerEvent::Error { severity, message } => {
                format!("{:?} error: {}", severity, message)
            }
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::BufferSize { .. } => EventSeverity::Debug,
            PlayerEvent::Error {
                severity: ErrorSeverity::Fatal,
                ..
            } => EventSeverity::Error,
            PlayerEvent::Error {
                severity: ErrorSeverity::Recoverable,
                ..
            } => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}
