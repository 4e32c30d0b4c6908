//! The transcription boundary.
//!
//! The speech-to-text engine is an external collaborator: the pipeline only
//! depends on the `Transcriber` contract. Latency is unbounded and failures
//! are caught per request by the dispatch workers.

use crate::error::{LivescribeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One timed text segment of a chunk transcript, chunk-relative seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// The engine's response for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkTranscript {
    /// Detected (or forced) language code.
    pub language: String,
    /// Measured audio duration in seconds.
    pub duration: f64,
    /// Ordered list of timed segments.
    pub segments: Vec<TranscriptSegment>,
}

impl ChunkTranscript {
    /// Segment texts joined into one line for the deduplication stage.
    pub fn merged_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    }

    /// Chunk-relative start of the first segment, zero when empty.
    pub fn first_segment_start(&self) -> f64 {
        self.segments.first().map(|s| s.start).unwrap_or(0.0)
    }
}

/// Trait for speech-to-text transcription of persisted chunks.
///
/// This trait allows swapping implementations (external engine vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe a persisted WAV chunk.
    ///
    /// # Arguments
    /// * `audio_path` - Path of a mono 16-bit PCM WAV file
    ///
    /// # Returns
    /// The chunk transcript or an error; errors never cross chunks.
    fn transcribe(&self, audio_path: &Path) -> Result<ChunkTranscript>;
}

/// Implement Transcriber for Arc<T> to allow sharing across workers.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio_path: &Path) -> Result<ChunkTranscript> {
        (**self).transcribe(audio_path)
    }
}

/// Transcriber used when no engine is configured: speech chunks are still
/// persisted, but produce no transcript text.
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
    fn transcribe(&self, _audio_path: &Path) -> Result<ChunkTranscript> {
        Ok(ChunkTranscript {
            language: String::new(),
            duration: 0.0,
            segments: Vec::new(),
        })
    }
}

/// Mock transcriber for testing
pub struct MockTranscriber {
    response: String,
    scripted: Mutex<VecDeque<ChunkTranscript>>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new() -> Self {
        Self {
            response: "mock transcription".to_string(),
            scripted: Mutex::new(VecDeque::new()),
            should_fail: false,
        }
    }

    /// Configure the mock to return a specific response text
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Queue scripted transcripts returned in order before the fixed response
    pub fn with_script(self, transcripts: Vec<ChunkTranscript>) -> Self {
        {
            let mut scripted = self.scripted.lock().unwrap_or_else(|e| e.into_inner());
            scripted.extend(transcripts);
        }
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Build a single-segment transcript, convenient for scripts.
    pub fn transcript(text: &str, duration: f64) -> ChunkTranscript {
        ChunkTranscript {
            language: "en".to_string(),
            duration,
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: duration,
                text: text.to_string(),
            }],
        }
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio_path: &Path) -> Result<ChunkTranscript> {
        if self.should_fail {
            return Err(LivescribeError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }

        let mut scripted = self.scripted.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = scripted.pop_front() {
            return Ok(next);
        }
        Ok(Self::transcript(&self.response, 2.0))
    }
}
