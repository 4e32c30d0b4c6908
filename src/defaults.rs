//! Default configuration constants for livescribe.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels. The whole pipeline is mono.
pub const CHANNELS: u16 = 1;

/// Capture block duration in milliseconds.
///
/// The frame source delivers blocks of this length; 30ms matches the largest
/// supported VAD sub-frame so a capture block maps onto whole sub-frames.
pub const FRAME_DURATION_MS: u32 = 30;

/// Chunk window duration in seconds.
pub const CHUNK_DURATION_S: f64 = 2.0;

/// Overlap carried from the tail of each chunk into the next, in seconds.
///
/// The overlap gives the transcription engine shared context across chunk
/// boundaries; the deduplication stage removes the resulting repeated text.
/// Must be strictly shorter than the chunk duration.
pub const OVERLAP_DURATION_S: f64 = 0.25;

/// RMS energy cutoff below which a chunk is silent without running VAD.
///
/// Computed on amplitude-normalized samples (full scale = 1.0). This is a
/// cheap prefilter; chunks above it still go through the sub-frame voice pass.
pub const RMS_PREFILTER_THRESHOLD: f32 = 0.003;

/// Minimum ratio of voiced sub-frames for a chunk to count as speech.
///
/// Non-strict: a chunk exactly at the threshold is classified as speech.
pub const SILENCE_THRESHOLD: f64 = 0.25;

/// VAD sub-frame duration in milliseconds. Supported values: 10, 20, 30.
/// Anything else is clamped to 30.
pub const VAD_FRAME_MS: u32 = 30;

/// VAD aggressiveness, 0 (most sensitive) to 3 (least). Clamped into range.
pub const VAD_MODE: u8 = 1;

/// Minimum accumulated silence before the silence/resume events are logged.
///
/// Prevents log flooding during ordinary between-sentence pauses.
pub const MIN_SILENCE_TO_LOG_S: f64 = 5.0;

/// Trailing token window used for prefix-overlap suppression.
pub const DEDUP_WINDOW: usize = 7;

/// Similarity ratio at or above which a new-text prefix is treated as a
/// repeat of the previous chunk's tail.
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// Stricter similarity ratio for whole-line suppression against recent
/// history lines. Kept independent from `FUZZY_THRESHOLD`; the two filters
/// apply sequentially.
pub const LINE_THRESHOLD: f64 = 0.87;

/// Number of recently emitted lines kept for whole-line suppression.
pub const LINE_HISTORY: usize = 8;

/// Number of recently emitted tokens kept for residual overlap trimming.
pub const TOKEN_HISTORY: usize = 100;

/// Minimum shared-token run length for the residual overlap trim to fire.
pub const MIN_OVERLAP_MATCH: usize = 5;

/// Maximum consecutive repeats of the same word kept by repetition collapse.
pub const MAX_WORD_REPEAT: usize = 2;

/// Silence gap, in seconds of global stream time, that closes the open
/// paragraph and starts a new one.
pub const PARAGRAPH_BREAK_S: f64 = 5.0;

/// Timeout for blocking queue pops in worker loops, in milliseconds.
///
/// Every blocking wait uses this bound and rechecks the shutdown flag,
/// keeping shutdown latency bounded.
pub const QUEUE_POLL_MS: u64 = 500;

/// Per-worker join timeout at shutdown, in milliseconds. A late join is
/// logged as a warning, not an error.
pub const JOIN_TIMEOUT_MS: u64 = 5000;

/// Backoff after an unexpected worker error before the loop resumes.
pub const ERROR_BACKOFF_MS: u64 = 100;

/// Frame queue capacity (capture callback → chunk worker).
pub const FRAME_QUEUE_CAPACITY: usize = 64;

/// Dispatch queue capacity (chunk worker → transcription workers).
pub const DISPATCH_QUEUE_CAPACITY: usize = 8;

/// Result queue capacity (transcription workers → merge worker).
pub const RESULT_QUEUE_CAPACITY: usize = 8;

/// Number of transcription dispatch workers.
///
/// With more than one worker, results are resequenced into chunk order
/// before they reach the deduplication stage.
pub const ASR_WORKERS: usize = 1;
