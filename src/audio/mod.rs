//! Audio capture, chunking, and speech gating.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod chunker;
pub mod frame;
pub mod gate;
pub mod vad;
pub mod wav;

use crate::error::Result;

/// A push-based producer of audio frames.
///
/// Implementations own the frame-queue sender and push fixed-size blocks of
/// mono 16-bit samples in delivery order. Dropping the sender (at end of
/// input or on stop) is the end-of-stream signal for downstream stages.
pub trait FrameSource: Send {
    /// Begin producing frames.
    fn start(&mut self) -> Result<()>;

    /// Stop producing frames and release the sender.
    fn stop(&mut self) -> Result<()>;
}

#[cfg(feature = "cpal-audio")]
pub use capture::MicSource;
pub use chunker::{ChunkBuilder, ChunkerConfig};
pub use frame::{Chunk, Frame};
pub use gate::{SkipReason, SpeechDecision, SpeechGate, SpeechGateConfig};
pub use vad::{SubframeVad, VadConfig, calculate_rms};
pub use wav::WavSource;
