//! Units of content held by the playback buffer.

use std::time::Duration;

use bridge_traits::PcmBuffer;
use uuid::Uuid;

use crate::completion::Completion;

/// Decoded audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub pcm: PcmBuffer,
    /// Source presentation timestamp, when the decoder reports one.
    pub timestamp: Option<Duration>,
}

impl AudioChunk {
    pub fn new(pcm: PcmBuffer) -> Self {
        Self {
            pcm,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn frames(&self) -> u64 {
        self.pcm.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.pcm.format.sample_rate
    }

    pub fn duration_s(&self) -> f64 {
        self.pcm.duration_s()
    }
}

/// Zero-duration marker identifying a point in the audio timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CuePoint {
    pub id: Uuid,
}

impl CuePoint {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Default for CuePoint {
    fn default() -> Self {
        Self::new()
    }
}

/// Element of the playback queue.
///
/// Markers (`Cue`, `Completion`) carry no audio and take no time.
#[derive(Debug)]
pub enum Chunk {
    Audio(AudioChunk),
    Cue(CuePoint),
    Completion(Completion),
}

impl Chunk {
    pub fn duration_s(&self) -> f64 {
        match self {
            Chunk::Audio(audio) => audio.duration_s(),
            Chunk::Cue(_) | Chunk::Completion(_) => 0.0,
        }
    }

    pub fn is_marker(&self) -> bool {
        !matches!(self, Chunk::Audio(_))
    }
}

impl From<AudioChunk> for Chunk {
    fn from(audio: AudioChunk) -> Self {
        Chunk::Audio(audio)
    }
}

impl From<PcmBuffer> for Chunk {
    fn from(pcm: PcmBuffer) -> Self {
        Chunk::Audio(AudioChunk::new(pcm))
    }
}

impl From<CuePoint> for Chunk {
    fn from(cue: CuePoint) -> Self {
        Chunk::Cue(cue)
    }
}

impl From<Completion> for Chunk {
    fn from(completion: Completion) -> Self {
        Chunk::Completion(completion)
    }
}
