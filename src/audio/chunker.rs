//! Overlap-windowed chunk builder.
//!
//! Accumulates arbitrary-size frames and emits fixed-duration chunks. The
//! tail of every emitted chunk (the overlap) is carried into the next one,
//! giving the transcription engine shared context across boundaries; the
//! deduplication stage removes the repeated text downstream.

use crate::audio::frame::Chunk;
use crate::defaults;
use tracing::warn;

/// Configuration for the chunk builder.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Chunk window duration in seconds.
    pub chunk_duration_s: f64,
    /// Overlap carried into the next chunk, in seconds.
    /// Must be shorter than `chunk_duration_s`.
    pub overlap_s: f64,
    /// Sample rate for size calculations.
    pub sample_rate: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_duration_s: defaults::CHUNK_DURATION_S,
            overlap_s: defaults::OVERLAP_DURATION_S,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl ChunkerConfig {
    /// Chunk length in samples.
    pub fn chunk_size_samples(&self) -> usize {
        (self.chunk_duration_s * self.sample_rate as f64) as usize
    }

    /// Overlap length in samples, clamped below the chunk length.
    pub fn overlap_size_samples(&self) -> usize {
        let overlap = (self.overlap_s * self.sample_rate as f64) as usize;
        overlap.min(self.chunk_size_samples().saturating_sub(1))
    }

    /// Effective new audio contributed per emitted chunk, in seconds.
    ///
    /// Falls back to the full chunk duration when the configuration is
    /// degenerate (overlap at or above the chunk duration).
    pub fn effective_step_s(&self) -> f64 {
        let step = self.chunk_duration_s - self.overlap_s;
        if step > 0.0 { step } else { self.chunk_duration_s }
    }
}

/// Accumulates frames into overlapping fixed-size chunks.
pub struct ChunkBuilder {
    config: ChunkerConfig,
    /// Pending samples: carried overlap plus frames not yet emitted.
    buffer: Vec<i16>,
    /// Index assigned to the next emitted chunk. Starts at 1, no gaps.
    next_index: u64,
}

impl ChunkBuilder {
    /// Creates a new chunk builder.
    ///
    /// An overlap at or above the chunk duration is a misconfiguration, not
    /// a fatal error: it is logged once and the effective step collapses to
    /// the chunk duration.
    pub fn new(config: ChunkerConfig) -> Self {
        if config.chunk_duration_s <= config.overlap_s {
            warn!(
                chunk_duration_s = config.chunk_duration_s,
                overlap_s = config.overlap_s,
                "chunk duration must exceed overlap; effective step collapses to the chunk duration"
            );
        }
        Self {
            config,
            buffer: Vec::new(),
            next_index: 1,
        }
    }

    /// Number of samples currently buffered.
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Index that will be assigned to the next emitted chunk.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Feeds one frame and returns every chunk that became complete.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Chunk> {
        self.buffer.extend_from_slice(samples);

        let chunk_size = self.config.chunk_size_samples();
        let overlap = self.config.overlap_size_samples();
        let mut chunks = Vec::new();

        while self.buffer.len() >= chunk_size {
            let chunk_samples: Vec<i16> = self.buffer[..chunk_size].to_vec();
            let leftover = &self.buffer[chunk_size..];

            // Next buffer: overlap tail of the emitted chunk, then any
            // genuine leftover beyond the chunk boundary.
            let mut carry = Vec::with_capacity(overlap + leftover.len());
            if overlap > 0 {
                carry.extend_from_slice(&chunk_samples[chunk_size - overlap..]);
            }
            carry.extend_from_slice(leftover);
            self.buffer = carry;

            chunks.push(Chunk::new(chunk_samples, self.next_index));
            self.next_index += 1;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_s: f64, overlap_s: f64) -> ChunkerConfig {
        ChunkerConfig {
            chunk_duration_s: chunk_s,
            overlap_s,
            sample_rate: 16000,
        }
    }

    #[test]
    fn test_config_sample_sizes() {
        let config = config(2.0, 0.25);
        assert_eq!(config.chunk_size_samples(), 32000);
        assert_eq!(config.overlap_size_samples(), 4000);
        assert!((config.effective_step_s() - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_overlap_collapses_step() {
        let config = config(2.0, 2.5);
        assert!((config.effective_step_s() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_chunk_until_threshold() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.25));

        // 31 frames of 1000 samples < 32000
        for _ in 0..31 {
            assert!(builder.push(&[1i16; 1000]).is_empty());
        }
        assert_eq!(builder.buffered_samples(), 31000);
    }

    #[test]
    fn test_chunk_has_exact_size() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.25));

        let chunks = builder.push(&vec![7i16; 33000]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples.len(), 32000);
        assert_eq!(chunks[0].index, 1);
    }

    #[test]
    fn test_carry_is_overlap_plus_leftover() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.25));

        // 33000 samples: one chunk of 32000, leftover 1000, overlap 4000
        builder.push(&vec![7i16; 33000]);
        assert_eq!(builder.buffered_samples(), 4000 + 1000);
    }

    #[test]
    fn test_carry_without_overlap_is_leftover_only() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.0));

        builder.push(&vec![7i16; 33000]);
        assert_eq!(builder.buffered_samples(), 1000);
    }

    #[test]
    fn test_carry_content_is_chunk_tail() {
        let mut builder = ChunkBuilder::new(ChunkerConfig {
            chunk_duration_s: 1.0,
            overlap_s: 0.25,
            sample_rate: 8, // tiny sizes: chunk 8, overlap 2
        });

        let samples: Vec<i16> = (0..10).collect();
        let chunks = builder.push(&samples);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples, (0..8).collect::<Vec<i16>>());

        // Carry = last 2 of the chunk (6, 7) + leftover (8, 9)
        let next = builder.push(&(10..14).collect::<Vec<i16>>());
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].samples, vec![6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn test_indices_are_sequential_from_one() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.25));

        let mut indices = Vec::new();
        for _ in 0..10 {
            for chunk in builder.push(&vec![0i16; 16000]) {
                indices.push(chunk.index);
            }
        }

        assert!(!indices.is_empty());
        for (offset, index) in indices.iter().enumerate() {
            assert_eq!(*index, offset as u64 + 1);
        }
    }

    #[test]
    fn test_large_frame_emits_multiple_chunks() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.0));

        let chunks = builder.push(&vec![0i16; 32000 * 3]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].index, 3);
        assert_eq!(builder.buffered_samples(), 0);
    }

    #[test]
    fn test_chunk_size_invariant_across_random_frame_sizes() {
        let mut builder = ChunkBuilder::new(config(2.0, 0.25));

        // Deterministic irregular frame sizes
        let sizes = [160, 441, 1024, 999, 16000, 3, 7000, 31999, 1];
        let mut emitted = 0;
        for (round, size) in sizes.iter().cycle().take(100).enumerate() {
            for chunk in builder.push(&vec![(round % 100) as i16; *size]) {
                assert_eq!(chunk.samples.len(), 32000);
                emitted += 1;
            }
        }
        assert!(emitted > 0);
        // Buffer never retains a full chunk
        assert!(builder.buffered_samples() < 32000);
    }
}
