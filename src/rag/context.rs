// Context assembly: merge, rank, truncate and render the prompt
use serde::{Deserialize, Serialize};

use crate::rag::types::{sort_by_score_desc, ContextItem, Question, RetrievalResult};

const DEFAULT_INSTRUCTIONS: &str = "You are a friendly, knowledgeable tutor answering a student's question. \
Answer in your own voice as the tutor. Never mention or refer to \"the provided context\", \
\"the notes\", \"the text\" or any other source material; speak as if this knowledge is your own. \
If the material above contains examples, present them as examples you are offering yourself. \
Be concise and accurate.";

/// Fixed prompt frame. The rendered prompt is always
/// `context block`, then `question_label + question`, then `instructions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub question_label: String,
    pub instructions: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            question_label: "Question: ".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Maximum items kept after ranking
    pub top_k: usize,
    pub template: PromptTemplate,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            template: PromptTemplate::default(),
        }
    }
}

/// Merges remote and local context into a bounded, ordered prompt
pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    /// Create new assembler with default config
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// Rank both sequences together, keep the top-k and render the prompt
    pub fn assemble(
        &self,
        remote_items: Vec<ContextItem>,
        local_items: Vec<ContextItem>,
        question: &Question,
    ) -> RetrievalResult {
        let items = rank(remote_items, local_items, self.config.top_k);
        let prompt = self.render_prompt(&items, question);
        RetrievalResult { items, prompt }
    }

    /// Context paragraphs, then the question, then the instructions.
    /// Provenance and scores are never rendered.
    pub fn render_prompt(&self, items: &[ContextItem], question: &Question) -> String {
        let template = &self.config.template;
        let context_block = items
            .iter()
            .map(|item| item.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sections = Vec::with_capacity(3);
        if !context_block.is_empty() {
            sections.push(context_block);
        }
        sections.push(format!("{}{}", template.question_label, question.as_str()));
        sections.push(template.instructions.clone());

        sections.join("\n\n")
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenate remote then local, stable-sort by descending score and
/// truncate to `top_k`. Equal scores keep concatenation order, so remote
/// items precede local ones on ties. Items with empty text are dropped.
pub fn rank(
    remote_items: Vec<ContextItem>,
    local_items: Vec<ContextItem>,
    top_k: usize,
) -> Vec<ContextItem> {
    let mut merged: Vec<ContextItem> = remote_items
        .into_iter()
        .chain(local_items)
        .filter(|item| !item.text.trim().is_empty())
        .collect();

    sort_by_score_desc(&mut merged);
    merged.truncate(top_k);
    merged
}
