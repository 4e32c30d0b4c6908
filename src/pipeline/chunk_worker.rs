//! Chunk worker: frame queue → chunk builder → speech gate → persist + dispatch.

use crate::audio::chunker::{ChunkBuilder, ChunkerConfig};
use crate::audio::frame::{Chunk, Frame};
use crate::audio::gate::{SpeechDecision, SpeechGate, SpeechGateConfig};
use crate::audio::wav;
use crate::defaults;
use crate::pipeline::types::DispatchJob;
use crate::stats::SessionStats;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Builds chunks from incoming frames, gates them, persists speech and
/// queues it for transcription. Runs on its own thread.
pub(crate) struct ChunkWorker {
    pub chunker: ChunkerConfig,
    pub gate: SpeechGateConfig,
    pub audio_dir: PathBuf,
    pub min_silence_to_log_s: f64,
    pub stats: Arc<SessionStats>,
}

impl ChunkWorker {
    pub(crate) fn run(
        self,
        frame_rx: Receiver<Frame>,
        dispatch_tx: Sender<DispatchJob>,
        order_tx: Sender<u64>,
        running: Arc<AtomicBool>,
    ) {
        let mut builder = ChunkBuilder::new(self.chunker);
        let gate = SpeechGate::new(self.gate);
        let step_s = self.chunker.effective_step_s();
        let poll = Duration::from_millis(defaults::QUEUE_POLL_MS);

        // Silence accounting across chunks.
        let mut silent_s = 0.0f64;
        let mut silence_logged = false;

        info!("chunk worker started, waiting for audio frames");

        loop {
            match frame_rx.recv_timeout(poll) {
                Ok(frame) => {
                    for chunk in builder.push(&frame.samples) {
                        self.process_chunk(
                            chunk,
                            &gate,
                            step_s,
                            &mut silent_s,
                            &mut silence_logged,
                            &dispatch_tx,
                            &order_tx,
                        );
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Queue timeout is not an error; recheck shutdown and go on.
                    debug!("frame queue empty after timeout");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("frame source closed, chunk worker finishing");
                    break;
                }
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }
        }

        info!("chunk worker shut down");
    }

    #[allow(clippy::too_many_arguments)]
    fn process_chunk(
        &self,
        chunk: Chunk,
        gate: &SpeechGate,
        step_s: f64,
        silent_s: &mut f64,
        silence_logged: &mut bool,
        dispatch_tx: &Sender<DispatchJob>,
        order_tx: &Sender<u64>,
    ) {
        let chunk_id = chunk.id();
        let duration_s = chunk.duration_s(self.chunker.sample_rate);

        match gate.classify(&chunk.samples) {
            SpeechDecision::Speech => {
                if *silent_s >= self.min_silence_to_log_s {
                    info!(
                        chunk = %chunk_id,
                        "speech resumed after ~{:.1}s of silence", silent_s
                    );
                }
                *silent_s = 0.0;
                *silence_logged = false;

                let path = wav::chunk_wav_path(&self.audio_dir, chunk.index);
                if let Err(e) = wav::save_chunk(&path, &chunk.samples, self.chunker.sample_rate) {
                    // Counted as not-saved; the pipeline continues.
                    error!(chunk = %chunk_id, error = %e, "failed to persist chunk");
                    std::thread::sleep(Duration::from_millis(defaults::ERROR_BACKOFF_MS));
                    return;
                }
                self.stats.increment_saved();
                info!(
                    chunk = %chunk_id,
                    path = %path.display(),
                    "saved speech chunk | duration {:.2}s", duration_s
                );

                if order_tx.send(chunk.index).is_err()
                    || dispatch_tx
                        .send(DispatchJob {
                            path,
                            chunk_id,
                            chunk_index: chunk.index,
                        })
                        .is_err()
                {
                    // Downstream is gone; nothing useful left to do here,
                    // but the loop keeps consuming frames until shutdown.
                    debug!("dispatch queue closed");
                }
            }
            SpeechDecision::Silent { reason } => {
                self.stats.increment_skipped(reason);
                *silent_s += step_s;
                debug!(
                    chunk = %chunk_id,
                    reason = reason.as_str(),
                    volume = gate.rms(&chunk.samples),
                    "skipped chunk | duration {:.2}s | cumulative silence ~{:.1}s",
                    duration_s,
                    silent_s
                );
                if *silent_s >= self.min_silence_to_log_s && !*silence_logged {
                    // One informational event per silent stretch.
                    info!("silence ongoing for ~{:.1}s", silent_s);
                    *silence_logged = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    fn worker(audio_dir: PathBuf) -> ChunkWorker {
        ChunkWorker {
            chunker: ChunkerConfig::default(),
            gate: SpeechGateConfig::default(),
            audio_dir,
            min_silence_to_log_s: 5.0,
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// A low-frequency tone loud enough to pass both gate stages.
    fn voiced_frame(count: usize) -> Frame {
        Frame::new(
            (0..count)
                .map(|i| {
                    let phase = (i % 160) as f32 / 160.0;
                    (4000.0 * (phase * std::f32::consts::TAU).sin()) as i16
                })
                .collect(),
        )
    }

    fn silent_frame(count: usize) -> Frame {
        Frame::new(vec![0i16; count])
    }

    #[test]
    fn speech_chunks_are_persisted_and_dispatched() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = worker(tmp.path().to_path_buf());
        let stats = worker.stats.clone();

        let (frame_tx, frame_rx) = unbounded();
        let (dispatch_tx, dispatch_rx) = bounded(8);
        let (order_tx, order_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        // One chunk of voiced audio (32000 samples), then end of input.
        frame_tx.send(voiced_frame(32000)).unwrap();
        drop(frame_tx);

        worker.run(frame_rx, dispatch_tx, order_tx, running);

        let job = dispatch_rx.try_recv().unwrap();
        assert_eq!(job.chunk_index, 1);
        assert_eq!(job.chunk_id, "chunk_0001");
        assert!(job.path.ends_with("chunk_0001.wav"));
        assert!(job.path.exists());
        assert_eq!(order_rx.try_recv().unwrap(), 1);
        assert_eq!(stats.summary().saved_chunks, 1);
    }

    #[test]
    fn silent_chunks_are_skipped_not_dispatched() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = worker(tmp.path().to_path_buf());
        let stats = worker.stats.clone();

        let (frame_tx, frame_rx) = unbounded();
        let (dispatch_tx, dispatch_rx) = bounded(8);
        let (order_tx, order_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        frame_tx.send(silent_frame(32000)).unwrap();
        drop(frame_tx);

        worker.run(frame_rx, dispatch_tx, order_tx, running);

        assert!(dispatch_rx.try_recv().is_err());
        assert!(order_rx.try_recv().is_err());
        let summary = stats.summary();
        assert_eq!(summary.saved_chunks, 0);
        assert_eq!(summary.skip_reasons.get("rms"), Some(&1));
        // No WAV file was written
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn indices_stay_sequential_across_mixed_input() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = worker(tmp.path().to_path_buf());

        let (frame_tx, frame_rx) = unbounded();
        let (dispatch_tx, dispatch_rx) = bounded(8);
        let (order_tx, order_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        // speech, silence, speech → indices 1, 2, 3; only 1 and 3 dispatch
        frame_tx.send(voiced_frame(32000)).unwrap();
        frame_tx.send(silent_frame(32000)).unwrap();
        frame_tx.send(voiced_frame(32000)).unwrap();
        drop(frame_tx);

        worker.run(frame_rx, dispatch_tx, order_tx, running);

        let indices: Vec<u64> = dispatch_rx.try_iter().map(|j| j.chunk_index).collect();
        assert_eq!(indices, vec![1, 3]);
        let announced: Vec<u64> = order_rx.try_iter().collect();
        assert_eq!(announced, vec![1, 3]);
    }

    #[test]
    fn persist_failure_keeps_pipeline_running() {
        // Point the worker at a directory that does not exist.
        let worker = worker(PathBuf::from("/nonexistent/livescribe-audio"));
        let stats = worker.stats.clone();

        let (frame_tx, frame_rx) = unbounded();
        let (dispatch_tx, dispatch_rx) = bounded(8);
        let (order_tx, _order_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        frame_tx.send(voiced_frame(32000)).unwrap();
        frame_tx.send(voiced_frame(32000)).unwrap();
        drop(frame_tx);

        worker.run(frame_rx, dispatch_tx, order_tx, running);

        // Both chunks failed to persist: not saved, not dispatched, no panic.
        assert_eq!(stats.summary().saved_chunks, 0);
        assert!(dispatch_rx.try_recv().is_err());
    }

    #[test]
    fn shutdown_flag_stops_the_worker() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = worker(tmp.path().to_path_buf());

        let (_frame_tx, frame_rx) = unbounded::<Frame>();
        let (dispatch_tx, _dispatch_rx) = bounded(8);
        let (order_tx, _order_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let thread_running = running.clone();
        let handle =
            std::thread::spawn(move || worker.run(frame_rx, dispatch_tx, order_tx, thread_running));

        running.store(false, Ordering::SeqCst);
        // The worker polls with a bounded timeout, so it exits promptly even
        // though the frame sender is still alive.
        handle.join().unwrap();
    }

}
