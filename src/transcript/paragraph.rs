//! Running transcript file with an in-place rewritable trailing paragraph.
//!
//! The transcript file holds one line per paragraph, formatted as
//! `[<start_seconds:.2f>] <text>`. Finalized paragraphs are appended and
//! never touched again; the open paragraph is the trailing line and is
//! rewritten in place on every update. A long silence gap finalizes the
//! open paragraph; shutdown flushes whatever is still open.

use crate::defaults;
use crate::error::Result;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for paragraph assembly.
#[derive(Debug, Clone, Copy)]
pub struct ParagraphConfig {
    /// Gap in global stream seconds that closes the open paragraph.
    pub break_gap_s: f64,
}

impl Default for ParagraphConfig {
    fn default() -> Self {
        Self {
            break_gap_s: defaults::PARAGRAPH_BREAK_S,
        }
    }
}

/// Writes deduplicated text into the transcript file, paragraph by
/// paragraph. Owned exclusively by the merge stage; no locking.
pub struct ParagraphWriter {
    path: PathBuf,
    config: ParagraphConfig,
    /// Open paragraph fragments, in arrival order.
    buffer: Vec<String>,
    /// Global start time of the open paragraph.
    start_s: f64,
    /// Global start time of the most recent fragment.
    last_push_s: f64,
    /// Byte offset where the open (rewritable) line begins.
    finalized_bytes: u64,
}

impl ParagraphWriter {
    pub fn new(path: &Path, config: ParagraphConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            config,
            buffer: Vec::new(),
            start_s: 0.0,
            last_push_s: 0.0,
            finalized_bytes: 0,
        }
    }

    /// True when a paragraph is currently open.
    pub fn is_open(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Append one deduplicated fragment at the given global start time.
    ///
    /// Opens a paragraph when none is open; finalizes the open one first
    /// when the silence gap since the previous fragment exceeds the break
    /// threshold. The trailing file line is rewritten on every call.
    pub fn push(&mut self, global_start_s: f64, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        if self.buffer.is_empty() {
            self.start_s = global_start_s;
        } else if global_start_s - self.last_push_s > self.config.break_gap_s {
            debug!(
                gap_s = global_start_s - self.last_push_s,
                "paragraph break on silence gap"
            );
            self.finalize_open()?;
            self.start_s = global_start_s;
        }

        self.buffer.push(text.to_string());
        self.last_push_s = global_start_s;
        self.rewrite_open_line()?;
        Ok(())
    }

    /// Terminal flush: finalize the open paragraph, if any. Called once at
    /// session shutdown; the line is never rewritten afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.finalize_open()
    }

    /// Current open paragraph line, if a paragraph is open.
    fn open_line(&self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(format!("[{:.2}] {}\n", self.start_s, self.buffer.join(" ")))
    }

    /// Rewrite the trailing line in place and truncate anything beyond it.
    fn rewrite_open_line(&mut self) -> Result<u64> {
        let Some(line) = self.open_line() else {
            return Ok(0);
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(self.finalized_bytes))?;
        file.write_all(line.as_bytes())?;
        let end = file.stream_position()?;
        file.set_len(end)?;
        Ok(line.len() as u64)
    }

    fn finalize_open(&mut self) -> Result<()> {
        let written = self.rewrite_open_line()?;
        if written > 0 {
            self.finalized_bytes += written;
            self.buffer.clear();
        }
        Ok(())
    }
}
