//! Pipeline wiring and lifecycle.
//!
//! Spawns the worker threads, connects them with bounded channels, and
//! owns the shared shutdown flag. Stage layout:
//!
//! ```text
//! FrameSource ─frames→ ChunkWorker ─jobs→ AsrWorker(s) ─results→ MergeWorker
//!                           └──────── order announcements ────────────┘
//! ```
//!
//! Every blocking wait inside the workers uses a bounded timeout and
//! rechecks the shutdown flag, so `stop` has bounded latency. Workers also
//! finish naturally when their upstream channel disconnects, which lets an
//! exhausted frame source drain the whole pipeline.

use crate::audio::chunker::ChunkerConfig;
use crate::audio::frame::Frame;
use crate::audio::gate::SpeechGateConfig;
use crate::audio::vad::VadConfig;
use crate::config::Config;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::asr_worker::AsrWorker;
use crate::pipeline::chunk_worker::ChunkWorker;
use crate::pipeline::merge_worker::MergeWorker;
use crate::pipeline::types::DispatchJob;
use crate::session::Session;
use crate::stats::SessionStats;
use crate::stt::Transcriber;
use crate::transcript::dedup::TranscriptDeduplicator;
use crate::transcript::paragraph::{ParagraphConfig, ParagraphWriter};
use crossbeam_channel::{Receiver, bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Configuration for the full pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub gate: SpeechGateConfig,
    pub dedup: crate::config::DedupConfig,
    pub paragraph: ParagraphConfig,
    /// Write per-chunk JSON transcripts.
    pub save_chunk_json: bool,
    /// Minimum accumulated silence before silence events are logged.
    pub min_silence_to_log_s: f64,
    /// Number of transcription dispatch workers.
    pub asr_workers: usize,
    /// Dispatch queue capacity.
    pub dispatch_buffer: usize,
    /// Result queue capacity.
    pub result_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            gate: SpeechGateConfig::default(),
            dedup: crate::config::DedupConfig::default(),
            paragraph: ParagraphConfig::default(),
            save_chunk_json: false,
            min_silence_to_log_s: defaults::MIN_SILENCE_TO_LOG_S,
            asr_workers: defaults::ASR_WORKERS,
            dispatch_buffer: defaults::DISPATCH_QUEUE_CAPACITY,
            result_buffer: defaults::RESULT_QUEUE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Build a pipeline configuration from the loaded application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunker: ChunkerConfig {
                chunk_duration_s: config.chunking.chunk_duration_s,
                overlap_s: config.chunking.overlap_s,
                sample_rate: config.audio.sample_rate,
            },
            gate: SpeechGateConfig {
                rms_threshold: config.gate.rms_threshold,
                silence_threshold: config.gate.silence_threshold,
                vad_frame_ms: config.gate.vad_frame_ms,
                vad: VadConfig {
                    mode: config.gate.vad_mode,
                },
                sample_rate: config.audio.sample_rate,
            },
            dedup: config.dedup.clone(),
            paragraph: ParagraphConfig {
                break_gap_s: config.transcript.paragraph_break_s,
            },
            save_chunk_json: config.transcript.save_chunk_json,
            min_silence_to_log_s: config.session.min_silence_to_log_s,
            asr_workers: config.session.asr_workers.max(1),
            dispatch_buffer: defaults::DISPATCH_QUEUE_CAPACITY,
            result_buffer: defaults::RESULT_QUEUE_CAPACITY,
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    threads: Vec<(String, JoinHandle<()>)>,
}

impl PipelineHandle {
    /// Request shutdown and join every worker with a bounded timeout.
    /// A late join is logged, never fatal.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        info!("pipeline shutdown requested");

        let timeout = Duration::from_millis(defaults::JOIN_TIMEOUT_MS);
        for (name, handle) in self.threads.drain(..) {
            join_with_timeout(handle, &name, timeout);
        }
        info!("pipeline shut down");
    }

    /// Wait for natural completion: every worker exits once its upstream
    /// channel disconnects (used with finite frame sources).
    pub fn wait(mut self) {
        for (name, handle) in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!(worker = %name, "worker thread panicked");
            }
        }
    }

    /// Returns true until shutdown has been requested.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn join_with_timeout(handle: JoinHandle<()>, name: &str, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(worker = %name, ?timeout, "worker did not stop in time, detaching");
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if handle.join().is_err() {
        warn!(worker = %name, "worker thread panicked");
    }
}

/// The multi-stage transcription pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Spawn all workers and start consuming the frame queue.
    ///
    /// # Arguments
    /// * `frame_rx` - Receiver side of the frame queue; the frame source
    ///   owns the sender.
    /// * `transcriber` - The external transcription collaborator.
    /// * `session` - Session directory layout.
    /// * `stats` - Shared statistics aggregator.
    pub fn start(
        self,
        frame_rx: Receiver<Frame>,
        transcriber: Arc<dyn Transcriber>,
        session: &Session,
        stats: Arc<SessionStats>,
    ) -> Result<PipelineHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let mut threads = Vec::new();

        let (dispatch_tx, dispatch_rx) = bounded::<DispatchJob>(self.config.dispatch_buffer);
        let (result_tx, result_rx) = bounded(self.config.result_buffer);
        // Ordering tickets are plain integers; keep this side unbounded so
        // the chunk worker can never stall on announcements.
        let (order_tx, order_rx) = unbounded();

        let chunk_worker = ChunkWorker {
            chunker: self.config.chunker,
            gate: self.config.gate,
            audio_dir: session.audio_dir.clone(),
            min_silence_to_log_s: self.config.min_silence_to_log_s,
            stats: stats.clone(),
        };
        let worker_running = running.clone();
        threads.push((
            "chunk-worker".to_string(),
            std::thread::Builder::new()
                .name("chunk-worker".to_string())
                .spawn(move || chunk_worker.run(frame_rx, dispatch_tx, order_tx, worker_running))?,
        ));

        for worker_id in 0..self.config.asr_workers.max(1) {
            let name = format!("asr-worker-{worker_id}");
            let asr_worker = AsrWorker {
                transcriber: transcriber.clone(),
                stats: stats.clone(),
                session: session.clone(),
                save_chunk_json: self.config.save_chunk_json,
            };
            let dispatch_rx = dispatch_rx.clone();
            let result_tx = result_tx.clone();
            let worker_running = running.clone();
            threads.push((
                name.clone(),
                std::thread::Builder::new()
                    .name(name)
                    .spawn(move || asr_worker.run(dispatch_rx, result_tx, worker_running))?,
            ));
        }
        // The merge worker sees disconnection once every dispatch worker
        // has dropped its clone.
        drop(result_tx);
        drop(dispatch_rx);

        let merge_worker = MergeWorker {
            dedup: TranscriptDeduplicator::new(self.config.dedup.clone()),
            writer: ParagraphWriter::new(&session.transcript_path(), self.config.paragraph),
            step_s: self.config.chunker.effective_step_s(),
        };
        let worker_running = running.clone();
        threads.push((
            "merge-worker".to_string(),
            std::thread::Builder::new()
                .name("merge-worker".to_string())
                .spawn(move || merge_worker.run(order_rx, result_rx, worker_running))?,
        ));

        info!(
            asr_workers = self.config.asr_workers.max(1),
            "pipeline started"
        );
        Ok(PipelineHandle { running, threads })
    }
}

/// Log the end-of-session summary the way the stats were collected:
/// counters first, then latency and language aggregates.
pub fn log_session_summary(session: &Session, stats: &SessionStats) {
    let summary = stats.summary();

    info!("===== session summary =====");
    info!(session = %session.id, "session");
    info!(saved = summary.saved_chunks, "chunks saved");
    let reasons = summary
        .skip_reasons
        .iter()
        .map(|(reason, count)| format!("{reason}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        skipped = summary.skipped_chunks,
        "chunks skipped ({})",
        if reasons.is_empty() {
            "none"
        } else {
            reasons.as_str()
        }
    );
    if let Some(latency) = summary.latency {
        info!(
            "transcription latency: avg {:.2}s (min {:.2}s, max {:.2}s, stddev {:.2}s)",
            latency.mean, latency.min, latency.max, latency.stddev
        );
    }
    if let Some(first) = summary.first_latency {
        info!("first transcription latency: {:.2}s", first);
    }
    if let Some(mean_duration) = summary.mean_chunk_duration {
        info!("average chunk duration: {:.2}s", mean_duration);
    }
    if let Some((language, count)) = summary.top_language {
        info!(language = %language, count, "most detected language");
    }
    info!("===========================");
}
