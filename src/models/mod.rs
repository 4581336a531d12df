//! Model collaborators
//!
//! The pipeline treats the embedding model and the language model as opaque
//! async functions. They are constructed explicitly and injected into
//! [`crate::rag::AskPipeline`]; nothing here is a process-wide singleton.
//!
//! - [`OllamaClient`]: both capabilities over the Ollama HTTP API
//! - [`BlockingEmbedder`] / [`BlockingGenerator`]: wrap synchronous model
//!   calls so they run on the blocking pool instead of the request task

pub mod blocking;
pub mod client;

use async_trait::async_trait;

use crate::rag::types::EmbeddingVector;

pub use blocking::{BlockingEmbedder, BlockingGenerator};
pub use client::OllamaClient;

/// Text -> vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector>;

    /// Load or health-check the model before the first request
    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Prompt -> text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Load or health-check the model before the first request
    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
