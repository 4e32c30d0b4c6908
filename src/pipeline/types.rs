//! Messages passed between pipeline stages.

use crate::stt::ChunkTranscript;
use std::path::PathBuf;

/// A persisted speech chunk queued for transcription.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    /// Path of the persisted WAV file.
    pub path: PathBuf,
    /// Zero-padded chunk identifier, e.g. `chunk_0004`.
    pub chunk_id: String,
    /// Monotonic chunk index.
    pub chunk_index: u64,
}

/// One transcription outcome on its way to the merge stage.
///
/// A `None` transcript marks a failed request: the merge stage releases the
/// chunk's ordering ticket so later chunks are not blocked behind it.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub chunk_index: u64,
    pub transcript: Option<ChunkTranscript>,
}
