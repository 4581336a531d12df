//! Adapters for synchronous model calls
//!
//! In-process models block while they run. These wrappers move the call
//! onto tokio's blocking pool so concurrent requests keep making progress.

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Embedder, Generator};
use crate::rag::types::EmbeddingVector;

type EmbedFn = dyn Fn(&str) -> anyhow::Result<EmbeddingVector> + Send + Sync;
type GenerateFn = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// Runs a synchronous embedding function on the blocking pool
#[derive(Clone)]
pub struct BlockingEmbedder {
    func: Arc<EmbedFn>,
}

impl BlockingEmbedder {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<EmbeddingVector> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl Embedder for BlockingEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector> {
        let func = Arc::clone(&self.func);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || func(&text))
            .await
            .map_err(|e| anyhow!("embedding task panicked: {}", e))?
    }
}

/// Runs a synchronous generation function on the blocking pool
#[derive(Clone)]
pub struct BlockingGenerator {
    func: Arc<GenerateFn>,
}

impl BlockingGenerator {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl Generator for BlockingGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let func = Arc::clone(&self.func);
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || func(&prompt))
            .await
            .map_err(|e| anyhow!("generation task panicked: {}", e))?
    }
}
