//! Optional per-chunk transcript artifact.

use crate::error::{LivescribeError, Result};
use crate::stt::ChunkTranscript;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write one chunk's raw transcript as pretty-printed JSON.
pub fn save_chunk_transcript(transcript: &ChunkTranscript, path: &Path) -> Result<()> {
    let persist_err = |message: String| LivescribeError::Persistence {
        path: path.display().to_string(),
        message,
    };

    let file = File::create(path).map_err(|e| persist_err(e.to_string()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), transcript)
        .map_err(|e| persist_err(e.to_string()))?;
    Ok(())
}
