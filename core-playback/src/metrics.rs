//! Buffer level reporting and counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Buffered plus scheduled audio, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferLevel {
    /// Mean over the averaging window.
    pub averaged_s: f64,
    /// Latest reading.
    pub current_s: f64,
}

/// Sliding window of buffer level readings.
#[derive(Debug)]
pub struct BufferMetrics {
    window: Duration,
    readings: Mutex<VecDeque<(Instant, f64)>>,
}

impl BufferMetrics {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            readings: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, level_s: f64) -> BufferLevel {
        self.record_at(Instant::now(), level_s)
    }

    /// Adds a reading taken at `at` and drops readings older than the window.
    pub fn record_at(&self, at: Instant, level_s: f64) -> BufferLevel {
        let mut readings = self.readings.lock();
        readings.push_back((at, level_s));
        while let Some((taken, _)) = readings.front() {
            if at.saturating_duration_since(*taken) > self.window {
                readings.pop_front();
            } else {
                break;
            }
        }
        Self::level_of(&readings)
    }

    pub fn level(&self) -> BufferLevel {
        Self::level_of(&self.readings.lock())
    }

    pub fn clear(&self) {
        self.readings.lock().clear();
    }

    fn level_of(readings: &VecDeque<(Instant, f64)>) -> BufferLevel {
        let Some(&(_, current_s)) = readings.back() else {
            return BufferLevel::default();
        };
        let sum: f64 = readings.iter().map(|(_, level)| level).sum();
        BufferLevel {
            averaged_s: sum / readings.len() as f64,
            current_s,
        }
    }
}

/// Snapshot of the buffer's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferStats {
    pub underruns: u64,
    pub chunks_scheduled: u64,
    pub markers_armed: u64,
    pub markers_discarded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    underruns: AtomicU64,
    chunks_scheduled: AtomicU64,
    markers_armed: AtomicU64,
    markers_discarded: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn chunk_scheduled(&self) {
        self.chunks_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn marker_armed(&self) {
        self.markers_armed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn marker_discarded(&self) {
        self.markers_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BufferStats {
        BufferStats {
            underruns: self.underruns.load(Ordering::Relaxed),
            chunks_scheduled: self.chunks_scheduled.load(Ordering::Relaxed),
            markers_armed: self.markers_armed.load(Ordering::Relaxed),
            markers_discarded: self.markers_discarded.load(Ordering::Relaxed),
        }
    }
}
