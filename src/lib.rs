//! AskBuddy v0.1.0 - Retrieval-augmented question answering
//!
//! Gathers context from a remote vector-match store and caller-supplied
//! notes, ranks it against the question embedding, and asks a language
//! model for the answer.
//!
//! # Architecture
//!
//! - **rag**: similarity scoring, remote retrieval, context assembly, pipeline
//! - **models**: injected embedding and generation collaborators
//! - **session**: best-effort debug transcript
//! - **telemetry**: per-request events and cumulative stats

pub mod errors;
pub mod config;
pub mod cli;
pub mod models;
pub mod rag;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{AskError, ErrorKind, Result};
pub use rag::{AskPipeline, AskResponse, ContextItem, LocalFragment, RetrievalRequest};
