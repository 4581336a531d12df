// Debug transcript of the last answered request
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 80;

/// One answered request
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub question: String,
    pub timestamp: DateTime<Local>,
    pub contexts_used: usize,
    pub prompt: String,
    pub response: String,
}

impl TranscriptEntry {
    /// Render the diagnostic text written to disk
    pub fn render(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        let mut out = String::new();
        out.push_str(&format!("{}\nAI Tutor Response\n{}\n", heavy, heavy));
        out.push_str(&format!("Question: {}\n", self.question));
        out.push_str(&format!("Timestamp: {}\n", self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f")));
        out.push_str(&format!("Contexts used: {}\n\n", self.contexts_used));
        out.push_str(&format!("{}\nPROMPT SENT TO LLM:\n{}\n", light, light));
        out.push_str(&format!("{}\n\n", self.prompt));
        out.push_str(&format!("{}\nLLM RESPONSE:\n{}\n", light, light));
        out.push_str(&format!("{}\n{}\n", self.response, heavy));
        out
    }
}

/// Best-effort sink for transcripts. Callers log failures and move on.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn record(&self, entry: &TranscriptEntry) -> Result<()>;
}

/// Overwrites a single file with the latest transcript (last writer wins)
pub struct FileTranscript {
    path: PathBuf,
}

impl FileTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptSink for FileTranscript {
    async fn record(&self, entry: &TranscriptEntry) -> Result<()> {
        tokio::fs::write(&self.path, entry.render())
            .await
            .with_context(|| format!("Failed to write transcript to {}", self.path.display()))
    }
}

/// Discards transcripts
pub struct NoopTranscript;

#[async_trait]
impl TranscriptSink for NoopTranscript {
    async fn record(&self, _entry: &TranscriptEntry) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(response: &str) -> TranscriptEntry {
        TranscriptEntry {
            question: "What is a heap?".to_string(),
            timestamp: Local::now(),
            contexts_used: 2,
            prompt: "PROMPT BODY".to_string(),
            response: response.to_string(),
        }
    }

    #[test]
    fn test_render_section_order() {
        let text = entry("ANSWER BODY").render();

        let header = text.find("AI Tutor Response").unwrap();
        let question = text.find("Question: What is a heap?").unwrap();
        let timestamp = text.find("Timestamp: ").unwrap();
        let count = text.find("Contexts used: 2").unwrap();
        let prompt = text.find("PROMPT BODY").unwrap();
        let response = text.find("ANSWER BODY").unwrap();

        assert!(header < question && question < timestamp && timestamp < count);
        assert!(count < prompt && prompt < response);
    }

    #[tokio::test]
    async fn test_file_transcript_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscript::new(dir.path().join("temp.txt"));

        sink.record(&entry("first answer")).await.unwrap();
        sink.record(&entry("second answer")).await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert!(text.contains("second answer"));
        assert!(!text.contains("first answer"));
    }

    #[tokio::test]
    async fn test_file_transcript_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscript::new(dir.path().join("missing").join("temp.txt"));
        assert!(sink.record(&entry("x")).await.is_err());
    }

    #[test]
    fn test_noop_transcript() {
        let result = tokio_test::block_on(NoopTranscript.record(&entry("x")));
        assert!(result.is_ok());
    }
}
