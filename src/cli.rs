//! Command-line interface for livescribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live microphone transcription with overlap-windowed chunking
#[derive(Parser, Debug)]
#[command(
    name = "livescribe",
    version,
    about = "Live microphone transcription with overlap-windowed chunking"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Transcribe a WAV file instead of the microphone
    #[arg(long, value_name = "PATH")]
    pub wav: Option<PathBuf>,

    /// Root directory for session output
    #[arg(long, value_name = "PATH")]
    pub session_dir: Option<PathBuf>,

    /// Chunk duration. Examples: 2s, 1500ms, 2.5
    #[arg(long, short = 'c', value_name = "DURATION", value_parser = parse_secs)]
    pub chunk_duration: Option<f64>,

    /// Overlap carried between chunks. Examples: 250ms, 0.25
    #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
    pub overlap: Option<f64>,

    /// Transcription command; `{path}` expands to the chunk WAV path
    #[arg(long, value_name = "COMMAND")]
    pub stt_command: Option<String>,

    /// Language hint for the engine (default: auto-detect)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Also write a JSON transcript per chunk
    #[arg(long)]
    pub save_json: bool,
}

/// Parse a duration string into seconds.
///
/// Supports bare numbers (seconds, fractions allowed) and any format
/// accepted by `humantime`: single-unit (`30s`, `250ms`) and compound
/// (`1m30s`).
fn parse_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        if secs >= 0.0 {
            return Ok(secs);
        }
        return Err("duration must not be negative".to_string());
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
}
