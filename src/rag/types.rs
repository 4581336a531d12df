// Request-scoped data model for the ask pipeline
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{AskError, Result};

/// Fixed-length embedding produced by an [`crate::models::Embedder`]
pub type EmbeddingVector = Vec<f32>;

/// A validated, trimmed, non-empty question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question(String);

impl Question {
    /// Trim and validate raw user input
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AskError::InvalidInput(
                "question must be non-empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied note fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFragment {
    pub text: String,
    #[serde(default, alias = "title")]
    pub note_title: Option<String>,
    #[serde(default, alias = "id")]
    pub note_id: Option<i64>,
}

impl LocalFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.note_title = Some(title.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.note_id = Some(id);
        self
    }
}

/// Where a context item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextOrigin {
    Remote,
    Local,
}

impl ContextOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextOrigin::Remote => "remote",
            ContextOrigin::Local => "local",
        }
    }
}

/// Scored text fragment eligible for the prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub origin: ContextOrigin,
    pub text: String,
    /// Cosine-similarity units; not clamped
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ContextItem {
    pub fn remote(text: impl Into<String>, score: f32) -> Self {
        Self::new(ContextOrigin::Remote, text, score)
    }

    pub fn local(text: impl Into<String>, score: f32) -> Self {
        Self::new(ContextOrigin::Local, text, score)
    }

    fn new(origin: ContextOrigin, text: impl Into<String>, score: f32) -> Self {
        Self {
            origin,
            text: text.into(),
            score,
            title: None,
            identifier: None,
            course_id: None,
            metadata: None,
        }
    }
}

/// Sort descending by score. Stable, so equal scores keep their input order.
/// NaN ranks below every number.
pub fn sort_by_score_desc(items: &mut [ContextItem]) {
    items.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Inbound `Ask` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub question: String,
    #[serde(default, alias = "local_chunks")]
    pub local_fragments: Vec<LocalFragment>,
    /// Falls back to the configured match count when absent
    #[serde(default)]
    pub match_count: Option<usize>,
    #[serde(default, alias = "course_id")]
    pub scope_filter: Option<i64>,
}

impl RetrievalRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<LocalFragment>) -> Self {
        self.local_fragments = fragments;
        self
    }

    pub fn with_match_count(mut self, match_count: usize) -> Self {
        self.match_count = Some(match_count);
        self
    }

    pub fn with_scope(mut self, course_id: i64) -> Self {
        self.scope_filter = Some(course_id);
        self
    }
}

/// Ranked, truncated context plus the rendered prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub items: Vec<ContextItem>,
    pub prompt: String,
}

/// Outbound `Ask` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_trimmed() {
        let q = Question::parse("  What is recursion?\n").unwrap();
        assert_eq!(q.as_str(), "What is recursion?");
    }

    #[test]
    fn test_question_whitespace_rejected() {
        let err = Question::parse(" \t\n ").unwrap_err();
        assert!(matches!(err, AskError::InvalidInput(_)));
    }

    #[test]
    fn test_request_accepts_source_field_names() {
        let req: RetrievalRequest = serde_json::from_str(
            r#"{"question":"q","local_chunks":[{"text":"a","note_title":"T","note_id":3}],"course_id":9}"#,
        )
        .unwrap();
        assert_eq!(req.local_fragments.len(), 1);
        assert_eq!(req.local_fragments[0].note_id, Some(3));
        assert_eq!(req.scope_filter, Some(9));
        assert!(req.match_count.is_none());
    }

    #[test]
    fn test_stable_sort_keeps_tie_order() {
        let mut items = vec![
            ContextItem::remote("r1", 0.5),
            ContextItem::local("l1", 0.9),
            ContextItem::local("l2", 0.5),
        ];
        sort_by_score_desc(&mut items);
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["l1", "r1", "l2"]);
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut items = vec![
            ContextItem::local("nan", f32::NAN),
            ContextItem::remote("low", -0.5),
            ContextItem::remote("high", 0.9),
        ];
        sort_by_score_desc(&mut items);
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "low", "nan"]);
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        let json = serde_json::to_string(&ContextItem::remote("x", 0.1)).unwrap();
        assert!(json.contains(r#""origin":"remote""#));
        assert!(!json.contains("metadata"));
    }
}
