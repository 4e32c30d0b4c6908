//! Error types for livescribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivescribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Chunk handling errors
    #[error("Malformed audio chunk: {message}")]
    ChunkFormat { message: String },

    // Persistence errors
    #[error("Failed to persist {path}: {message}")]
    Persistence { path: String, message: String },

    // Transcription boundary errors
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LivescribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = LivescribeError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = LivescribeError::ConfigInvalidValue {
            key: "chunking.overlap_s".to_string(),
            message: "must be shorter than chunk_duration_s".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for chunking.overlap_s: must be shorter than chunk_duration_s"
        );
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = LivescribeError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = LivescribeError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_chunk_format_display() {
        let error = LivescribeError::ChunkFormat {
            message: "empty chunk".to_string(),
        };
        assert_eq!(error.to_string(), "Malformed audio chunk: empty chunk");
    }

    #[test]
    fn test_persistence_display() {
        let error = LivescribeError::Persistence {
            path: "/tmp/chunk_0001.wav".to_string(),
            message: "disk full".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to persist /tmp/chunk_0001.wav: disk full"
        );
    }

    #[test]
    fn test_transcription_display() {
        let error = LivescribeError::Transcription {
            message: "engine crashed".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription failed: engine crashed");
    }

    #[test]
    fn test_other_display() {
        let error = LivescribeError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: LivescribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: LivescribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LivescribeError>();
        assert_sync::<LivescribeError>();
    }
}
