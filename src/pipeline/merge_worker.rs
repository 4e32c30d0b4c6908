//! Merge worker: resequenced transcription results → dedup → transcript file.
//!
//! This is the single writer of all deduplication and paragraph state; the
//! algorithm is order-sensitive, so results pass through the resequence
//! buffer and reach it strictly in chunk-index order.

use crate::defaults;
use crate::pipeline::reorder::ResequenceBuffer;
use crate::pipeline::types::ChunkResult;
use crate::stt::ChunkTranscript;
use crate::transcript::dedup::TranscriptDeduplicator;
use crate::transcript::paragraph::ParagraphWriter;
use crossbeam_channel::{Receiver, never, select};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Consumes ordering announcements and results, deduplicates in order and
/// maintains the running transcript file.
pub(crate) struct MergeWorker {
    pub dedup: TranscriptDeduplicator,
    pub writer: ParagraphWriter,
    /// Effective new audio per chunk, for global time offsets.
    pub step_s: f64,
}

impl MergeWorker {
    pub(crate) fn run(
        mut self,
        order_rx: Receiver<u64>,
        result_rx: Receiver<ChunkResult>,
        running: Arc<AtomicBool>,
    ) {
        let poll = Duration::from_millis(defaults::QUEUE_POLL_MS);
        let mut buffer: ResequenceBuffer<ChunkTranscript> = ResequenceBuffer::new();

        let never_order = never::<u64>();
        let never_result = never::<ChunkResult>();
        let mut order_open = true;
        let mut result_open = true;

        while order_open || result_open {
            let order_ch = if order_open { &order_rx } else { &never_order };
            let result_ch = if result_open { &result_rx } else { &never_result };

            select! {
                recv(order_ch) -> msg => match msg {
                    Ok(index) => {
                        for (index, transcript) in buffer.announce(index) {
                            self.consume(index, transcript);
                        }
                    }
                    Err(_) => order_open = false,
                },
                recv(result_ch) -> msg => match msg {
                    Ok(result) => {
                        let released = match result.transcript {
                            Some(transcript) => buffer.accept(result.chunk_index, transcript),
                            None => buffer.abandon(result.chunk_index),
                        };
                        for (index, transcript) in released {
                            self.consume(index, transcript);
                        }
                    }
                    Err(_) => result_open = false,
                },
                default(poll) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }

        if buffer.pending() > 0 {
            debug!(
                held = buffer.pending(),
                "discarding unreleased results at shutdown"
            );
        }

        // Terminal flush of the open paragraph.
        if let Err(e) = self.writer.finish() {
            error!(error = %e, "failed to flush final paragraph");
        }
        info!("merge worker shut down, transcript finalized");
    }

    fn consume(&mut self, chunk_index: u64, transcript: ChunkTranscript) {
        if transcript.segments.is_empty() {
            debug!(chunk_index, "empty transcription result");
            return;
        }

        let merged = transcript.merged_text();
        let cleaned = self.dedup.dedup(&merged);
        if cleaned.is_empty() {
            debug!(chunk_index, "dedup suppressed chunk text");
            return;
        }

        let global_start_s =
            (chunk_index - 1) as f64 * self.step_s + transcript.first_segment_start();

        if let Err(e) = self.writer.push(global_start_s, &cleaned) {
            error!(chunk_index, error = %e, "failed to update transcript file");
            return;
        }
        info!(chunk_index, "paragraph updated: {}", preview(&cleaned));
    }
}

/// First few words of a line for log output.
fn preview(text: &str) -> &str {
    let max = 60;
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
