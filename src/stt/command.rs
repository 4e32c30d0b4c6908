//! External transcription engine driven through a child process.
//!
//! The engine stays outside the pipeline: a configured command line is run
//! once per chunk and must print the chunk transcript as JSON on stdout
//! (`{"language", "duration", "segments": [{"start","end","text"}]}`).
//! The `{path}` placeholder expands to the chunk's WAV path; when absent,
//! the path is appended as the final argument.

use crate::error::{LivescribeError, Result};
use crate::stt::transcriber::{ChunkTranscript, Transcriber};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Placeholder replaced by the WAV path in the configured command line.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Transcriber that shells out to a configured command per chunk.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
    /// Language hint appended as `--language <code>` unless set to `auto`.
    language: Option<String>,
}

impl CommandTranscriber {
    /// Parse a command line like `whisper-cli --output-json {path}`.
    ///
    /// Splitting is whitespace-based; quoting is not interpreted.
    pub fn new(command_line: &str, language: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| LivescribeError::Transcription {
            message: "empty transcription command".to_string(),
        })?;

        let language = if language.is_empty() || language == "auto" {
            None
        } else {
            Some(language.to_string())
        };

        Ok(Self {
            program,
            args: parts.collect(),
            language,
        })
    }

    fn build_args(&self, audio_path: &Path) -> Vec<String> {
        let path_str = audio_path.display().to_string();
        let mut args: Vec<String> = Vec::with_capacity(self.args.len() + 3);
        let mut substituted = false;

        for arg in &self.args {
            if arg.contains(PATH_PLACEHOLDER) {
                args.push(arg.replace(PATH_PLACEHOLDER, &path_str));
                substituted = true;
            } else {
                args.push(arg.clone());
            }
        }
        if let Some(language) = &self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        if !substituted {
            args.push(path_str);
        }
        args
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<ChunkTranscript> {
        let args = self.build_args(audio_path);
        debug!(program = %self.program, ?args, "running transcription command");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            LivescribeError::Transcription {
                message: format!("failed to launch '{}': {}", self.program, e),
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LivescribeError::Transcription {
                message: format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| LivescribeError::Transcription {
            message: format!("invalid transcript JSON from '{}': {}", self.program, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_command_is_error() {
        assert!(CommandTranscriber::new("", "auto").is_err());
        assert!(CommandTranscriber::new("   ", "auto").is_err());
    }

    #[test]
    fn test_placeholder_substitution() {
        let t = CommandTranscriber::new("engine --json --input {path}", "auto").unwrap();
        let args = t.build_args(&PathBuf::from("/tmp/chunk_0001.wav"));
        assert_eq!(args, vec!["--json", "--input", "/tmp/chunk_0001.wav"]);
    }

    #[test]
    fn test_path_appended_without_placeholder() {
        let t = CommandTranscriber::new("engine --json", "auto").unwrap();
        let args = t.build_args(&PathBuf::from("/tmp/a.wav"));
        assert_eq!(args, vec!["--json", "/tmp/a.wav"]);
    }

    #[test]
    fn test_language_hint_is_passed_through() {
        let t = CommandTranscriber::new("engine {path}", "de").unwrap();
        let args = t.build_args(&PathBuf::from("/tmp/a.wav"));
        assert_eq!(args, vec!["/tmp/a.wav", "--language", "de"]);
    }

    #[test]
    fn test_auto_language_is_omitted() {
        let t = CommandTranscriber::new("engine {path}", "auto").unwrap();
        let args = t.build_args(&PathBuf::from("/tmp/a.wav"));
        assert_eq!(args, vec!["/tmp/a.wav"]);
    }

    #[test]
    fn test_missing_program_is_transcription_error() {
        let t = CommandTranscriber::new("definitely-not-a-real-binary-12345", "auto").unwrap();
        let result = t.transcribe(&PathBuf::from("/tmp/a.wav"));
        assert!(matches!(
            result,
            Err(LivescribeError::Transcription { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_valid_json_from_command() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in engine that prints a fixed transcript document.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-engine.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"language\":\"en\",\"duration\":2.0,\"segments\":[{\"start\":0.0,\"end\":2.0,\"text\":\"hello\"}]}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let t = CommandTranscriber::new(&script.display().to_string(), "auto").unwrap();
        let transcript = t.transcribe(&PathBuf::from("/tmp/a.wav")).unwrap();
        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.merged_text(), "hello");
    }

    #[test]
    fn test_invalid_json_is_transcription_error() {
        let t = CommandTranscriber::new("echo not-json", "auto").unwrap();
        let result = t.transcribe(&PathBuf::from("/tmp/a.wav"));
        assert!(matches!(
            result,
            Err(LivescribeError::Transcription { .. })
        ));
    }
}
