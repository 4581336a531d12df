// Retrieval-augmented answering
//
// Components:
// - Scoring: cosine similarity and local fragment scoring
// - Retrieval: remote vector-match store client
// - Context Assembler: merge, rank, truncate, render the prompt
// - Pipeline: per-request orchestration and its state machine

pub mod context;
pub mod pipeline;
pub mod retrieval;
pub mod scoring;
pub mod state;
pub mod types;

// Re-export key types
pub use context::{ContextAssembler, PromptTemplate};
pub use pipeline::{AskOutcome, AskPipeline, PipelineConfig};
pub use retrieval::{MatchStore, RemoteMatchClient};
pub use scoring::{similarity, LocalFragmentScorer};
pub use state::{AskEvent, AskState};
pub use types::{
    AskResponse, ContextItem, ContextOrigin, LocalFragment, Question, RetrievalRequest,
    RetrievalResult,
};
