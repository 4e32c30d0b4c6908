//! livescribe - live microphone transcription
//!
//! Ingests a live audio stream, segments it into overlapping fixed-duration
//! chunks, gates out silence, persists speech as WAV, dispatches it to an
//! external transcription engine, and deduplicates the overlap-derived text
//! into a running transcript.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod stt;
pub mod transcript;

// Core traits (source → process → sink)
pub use audio::FrameSource;
pub use stt::Transcriber;

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle};

// Error handling
pub use error::{LivescribeError, Result};

// Config
pub use config::Config;

// Session state
pub use session::Session;
pub use stats::SessionStats;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
