//! livescribe binary: live microphone (or WAV file) transcription sessions.

use anyhow::{Context, bail};
use clap::Parser;
use crossbeam_channel::bounded;
use livescribe::audio::FrameSource;
use livescribe::audio::wav::WavSource;
use livescribe::cli::{Cli, Commands};
use livescribe::config::Config;
use livescribe::pipeline::{Pipeline, PipelineConfig, log_session_summary};
use livescribe::session::Session;
use livescribe::stats::SessionStats;
use livescribe::stt::{CommandTranscriber, NullTranscriber, Transcriber};
use livescribe::{defaults, logging};
use std::sync::Arc;
use tracing::{info, warn};

/// Set by the SIGINT/SIGTERM handler; polled by the main loop.
#[cfg(feature = "cpal-audio")]
static SHUTDOWN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

#[cfg(feature = "cpal-audio")]
extern "C" fn handle_signal(_signal: libc::c_int) {
    SHUTDOWN.store(true, std::sync::atomic::Ordering::SeqCst);
}

#[cfg(feature = "cpal-audio")]
fn install_signal_handlers() {
    // SAFETY: handle_signal only touches an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Some(Commands::Devices) = cli.command {
        return list_devices();
    }

    let config = load_config(&cli)?;
    run_session(&cli, config)
}

fn list_devices() -> anyhow::Result<()> {
    #[cfg(feature = "cpal-audio")]
    {
        for device in livescribe::audio::capture::list_devices()? {
            println!("{device}");
        }
        Ok(())
    }
    #[cfg(not(feature = "cpal-audio"))]
    bail!("this build has no audio backend (cpal-audio feature disabled)")
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load_or_default(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    }
    .with_env_overrides();

    // CLI flags override file and environment.
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(dir) = &cli.session_dir {
        config.session.root = Some(dir.clone());
    }
    if let Some(chunk_duration) = cli.chunk_duration {
        config.chunking.chunk_duration_s = chunk_duration;
    }
    if let Some(overlap) = cli.overlap {
        config.chunking.overlap_s = overlap;
    }
    if let Some(command) = &cli.stt_command {
        config.stt.command = Some(command.clone());
    }
    if let Some(language) = &cli.language {
        config.stt.language = language.clone();
    }
    if cli.save_json {
        config.transcript.save_chunk_json = true;
    }

    if config.chunking.chunk_duration_s <= 0.0 {
        bail!("chunk duration must be positive");
    }
    Ok(config)
}

fn build_transcriber(config: &Config) -> anyhow::Result<Arc<dyn Transcriber>> {
    match &config.stt.command {
        Some(command) => Ok(Arc::new(CommandTranscriber::new(
            command,
            &config.stt.language,
        )?)),
        None => {
            warn!("no transcription command configured; recording chunks without transcripts");
            Ok(Arc::new(NullTranscriber))
        }
    }
}

fn run_session(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let session = Session::create(&config.session_root()).context("creating session directory")?;
    info!(session = %session.id, root = %session.root.display(), "session started");

    let stats = Arc::new(SessionStats::new());
    let transcriber = build_transcriber(&config)?;

    let (frame_tx, frame_rx) = bounded(defaults::FRAME_QUEUE_CAPACITY);
    let frame_samples =
        (config.audio.sample_rate as u64 * config.audio.frame_duration_ms as u64 / 1000) as usize;

    // Build the frame source before anything else: audio-device failure is
    // the one fatal startup error, and it must abort before any worker
    // thread is spawned.
    let offline = cli.wav.is_some();
    let mut source: Box<dyn FrameSource> = match &cli.wav {
        Some(wav_path) => {
            let source = WavSource::open(wav_path, frame_tx, frame_samples)
                .with_context(|| format!("opening {}", wav_path.display()))?;
            info!(path = %wav_path.display(), "replaying WAV file");
            Box::new(source)
        }
        None => make_mic_source(&config, frame_tx, frame_samples)?,
    };

    let pipeline = Pipeline::new(PipelineConfig::from_config(&config));
    let handle = pipeline.start(frame_rx, transcriber, &session, stats.clone())?;
    source.start()?;

    if offline {
        // The source drops its sender at end of file; the pipeline drains.
        handle.wait();
        source.stop()?;
    } else {
        wait_for_interrupt();
        info!("shutdown requested");
        source.stop()?;
        handle.stop();
    }

    log_session_summary(&session, &stats);
    info!(transcript = %session.transcript_path().display(), "session complete");
    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn make_mic_source(
    config: &Config,
    frame_tx: crossbeam_channel::Sender<livescribe::audio::Frame>,
    frame_samples: usize,
) -> anyhow::Result<Box<dyn FrameSource>> {
    use livescribe::audio::MicSource;

    let source = MicSource::new(
        config.audio.device.as_deref(),
        frame_tx,
        config.audio.sample_rate,
        frame_samples,
    )
    .context("initializing audio capture")?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "cpal-audio"))]
fn make_mic_source(
    _config: &Config,
    _frame_tx: crossbeam_channel::Sender<livescribe::audio::Frame>,
    _frame_samples: usize,
) -> anyhow::Result<Box<dyn FrameSource>> {
    bail!("this build has no microphone support; use --wav to transcribe a file")
}

/// Block until SIGINT/SIGTERM.
#[cfg(feature = "cpal-audio")]
fn wait_for_interrupt() {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    install_signal_handlers();
    info!("recording; press Ctrl+C to stop");
    while !SHUTDOWN.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Without an audio backend the live path is unreachable.
#[cfg(not(feature = "cpal-audio"))]
fn wait_for_interrupt() {}
