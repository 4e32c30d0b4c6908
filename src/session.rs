//! Session identity and on-disk layout.
//!
//! Each run of the pipeline owns one session directory:
//!
//! ```text
//! <root>/<session-id>/
//!   audio_chunks/   chunk_<NNNN>.wav
//!   transcripts/    transcript.txt, chunk_<NNNN>.json
//! ```

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A created session with its directory layout.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub root: PathBuf,
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
}

impl Session {
    /// Create a new session under `root` with a timestamp-derived id.
    pub fn create(root: &Path) -> Result<Self> {
        Self::with_id(root, &generate_session_id())
    }

    /// Create a session with an explicit id (used by tests).
    pub fn with_id(root: &Path, id: &str) -> Result<Self> {
        let session_root = root.join(id);
        let audio_dir = session_root.join("audio_chunks");
        let transcript_dir = session_root.join("transcripts");
        fs::create_dir_all(&audio_dir)?;
        fs::create_dir_all(&transcript_dir)?;

        Ok(Self {
            id: id.to_string(),
            root: session_root,
            audio_dir,
            transcript_dir,
        })
    }

    /// Path of the running transcript file.
    pub fn transcript_path(&self) -> PathBuf {
        self.transcript_dir.join("transcript.txt")
    }

    /// Path of the optional per-chunk JSON transcript.
    pub fn chunk_transcript_path(&self, chunk_index: u64) -> PathBuf {
        self.transcript_dir
            .join(format!("chunk_{:04}.json", chunk_index))
    }
}

/// Derive a session id like `session-20260806T142501Z` from the wall clock.
fn generate_session_id() -> String {
    let stamp = humantime::format_rfc3339_seconds(SystemTime::now()).to_string();
    let compact: String = stamp.chars().filter(|c| *c != '-' && *c != ':').collect();
    format!("session-{compact}")
}
