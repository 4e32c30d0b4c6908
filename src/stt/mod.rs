//! Speech-to-text boundary: the `Transcriber` contract and implementations.

pub mod command;
pub mod transcriber;

pub use command::CommandTranscriber;
pub use transcriber::{
    ChunkTranscript, MockTranscriber, NullTranscriber, Transcriber, TranscriptSegment,
};
