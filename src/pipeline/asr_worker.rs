//! Dispatch worker: dispatch queue → transcription engine → result queue.
//!
//! Engine latency is unbounded, but it is paid here, off the capture path.
//! Failures are caught per request and reported to the merge stage as an
//! abandoned chunk so later results are not blocked.

use crate::defaults;
use crate::pipeline::types::{ChunkResult, DispatchJob};
use crate::session::Session;
use crate::stats::SessionStats;
use crate::stt::Transcriber;
use crate::transcript::artifact;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Consumes dispatch jobs and turns them into chunk results.
pub(crate) struct AsrWorker {
    pub transcriber: Arc<dyn Transcriber>,
    pub stats: Arc<SessionStats>,
    pub session: Session,
    pub save_chunk_json: bool,
}

impl AsrWorker {
    pub(crate) fn run(
        self,
        dispatch_rx: Receiver<DispatchJob>,
        result_tx: Sender<ChunkResult>,
        running: Arc<AtomicBool>,
    ) {
        let poll = Duration::from_millis(defaults::QUEUE_POLL_MS);

        loop {
            match dispatch_rx.recv_timeout(poll) {
                Ok(job) => {
                    let result = self.transcribe_job(&job);
                    if result_tx.send(result).is_err() {
                        debug!("result queue closed, dispatch worker finishing");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("dispatch queue closed, dispatch worker finishing");
                    break;
                }
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }
        }
    }

    fn transcribe_job(&self, job: &DispatchJob) -> ChunkResult {
        debug!(chunk = %job.chunk_id, path = %job.path.display(), "sending chunk for transcription");
        let started = Instant::now();

        match self.transcriber.transcribe(&job.path) {
            Ok(transcript) => {
                let latency_s = started.elapsed().as_secs_f64();
                self.stats.add_latency(latency_s);
                // A null engine reports no language and a zero duration.
                if !transcript.language.is_empty() {
                    self.stats.add_language(&transcript.language);
                }
                if transcript.duration > 0.0 {
                    self.stats.add_chunk_duration(transcript.duration);
                }

                info!(
                    chunk = %job.chunk_id,
                    language = %transcript.language,
                    "transcription complete | duration {:.2}s | latency {:.2}s",
                    transcript.duration,
                    latency_s
                );

                if self.save_chunk_json {
                    let json_path = self.session.chunk_transcript_path(job.chunk_index);
                    if let Err(e) = artifact::save_chunk_transcript(&transcript, &json_path) {
                        warn!(chunk = %job.chunk_id, error = %e, "failed to save chunk transcript");
                    }
                }

                ChunkResult {
                    chunk_index: job.chunk_index,
                    transcript: Some(transcript),
                }
            }
            Err(e) => {
                // Isolated per chunk: later chunks are unaffected.
                error!(chunk = %job.chunk_id, error = %e, "transcription failed");
                ChunkResult {
                    chunk_index: job.chunk_index,
                    transcript: None,
                }
            }
        }
    }
}
