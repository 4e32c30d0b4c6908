use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub chunking: ChunkingConfig,
    pub gate: GateConfig,
    pub dedup: DedupConfig,
    pub transcript: TranscriptConfig,
    pub session: SessionConfig,
    pub stt: SttConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub frame_duration_ms: u32,
}

/// Overlap-windowed chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_duration_s: f64,
    pub overlap_s: f64,
}

/// Speech/silence gate configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// RMS prefilter cutoff on normalized samples.
    pub rms_threshold: f32,
    /// Minimum voiced sub-frame ratio for a speech classification.
    pub silence_threshold: f64,
    /// VAD sub-frame duration; values outside {10, 20, 30} clamp to 30.
    pub vad_frame_ms: u32,
    /// VAD aggressiveness, 0 (most sensitive) to 3 (least).
    pub vad_mode: u8,
}

/// Transcript deduplication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DedupConfig {
    pub window_size: usize,
    pub fuzzy_threshold: f64,
    pub line_threshold: f64,
    pub line_history: usize,
    pub token_history: usize,
    pub min_overlap_match: usize,
    pub max_word_repeat: usize,
}

/// Transcript assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Silence gap (seconds of stream time) that finalizes the open paragraph.
    pub paragraph_break_s: f64,
    /// Also write a `chunk_<NNNN>.json` transcript per chunk.
    pub save_chunk_json: bool,
}

/// Session layout and pipeline housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Root directory holding per-session directories. Defaults to
    /// `~/.local/share/livescribe/sessions` (platform equivalent).
    pub root: Option<PathBuf>,
    pub min_silence_to_log_s: f64,
    /// Number of transcription dispatch workers.
    pub asr_workers: usize,
}

/// External transcription engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Command line invoked per chunk; `{path}` expands to the WAV path.
    /// The command must print a chunk transcript as JSON on stdout.
    pub command: Option<String>,
    /// Language hint passed through to the engine (`auto` = detect).
    pub language: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_duration_ms: defaults::FRAME_DURATION_MS,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_duration_s: defaults::CHUNK_DURATION_S,
            overlap_s: defaults::OVERLAP_DURATION_S,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            rms_threshold: defaults::RMS_PREFILTER_THRESHOLD,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            vad_frame_ms: defaults::VAD_FRAME_MS,
            vad_mode: defaults::VAD_MODE,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::DEDUP_WINDOW,
            fuzzy_threshold: defaults::FUZZY_THRESHOLD,
            line_threshold: defaults::LINE_THRESHOLD,
            line_history: defaults::LINE_HISTORY,
            token_history: defaults::TOKEN_HISTORY,
            min_overlap_match: defaults::MIN_OVERLAP_MATCH,
            max_word_repeat: defaults::MAX_WORD_REPEAT,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            paragraph_break_s: defaults::PARAGRAPH_BREAK_S,
            save_chunk_json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root: None,
            min_silence_to_log_s: defaults::MIN_SILENCE_TO_LOG_S,
            asr_workers: defaults::ASR_WORKERS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            command: None,
            language: "auto".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LIVESCRIBE_AUDIO_DEVICE → audio.device
    /// - LIVESCRIBE_SESSION_ROOT → session.root
    /// - LIVESCRIBE_STT_COMMAND → stt.command
    /// - LIVESCRIBE_LANGUAGE → stt.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("LIVESCRIBE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(root) = std::env::var("LIVESCRIBE_SESSION_ROOT")
            && !root.is_empty()
        {
            self.session.root = Some(PathBuf::from(root));
        }

        if let Ok(command) = std::env::var("LIVESCRIBE_STT_COMMAND")
            && !command.is_empty()
        {
            self.stt.command = Some(command);
        }

        if let Ok(language) = std::env::var("LIVESCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/livescribe/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("livescribe").join("config.toml"))
    }

    /// Resolve the session root directory, falling back to the platform
    /// data directory when unset.
    pub fn session_root(&self) -> PathBuf {
        self.session.root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("livescribe")
                .join("sessions")
        })
    }
}
