// Per-request side channels
//
// - Transcript: best-effort debug dump of the last answered request

pub mod transcript;

pub use transcript::{FileTranscript, NoopTranscript, TranscriptEntry, TranscriptSink};
