//! Ollama API client for embeddings and generation
//!
//! - Endpoint: POST /api/embeddings
//! - Endpoint: POST /api/generate (non-streaming)
//! - Health: GET /api/version

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::errors::{AskError, Result};
use crate::models::{Embedder, Generator};
use crate::rag::types::EmbeddingVector;

/// Ollama HTTP client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
}

impl OllamaClient {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(&OllamaConfig::default())
    }

    /// Create client from configuration
    pub fn with_config(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> anyhow::Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            bail!("Ollama HTTP {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;

        if response.embedding.is_empty() {
            return Err(anyhow!(
                "Ollama returned an empty embedding for model {}",
                self.embedding_model
            ));
        }
        Ok(response.embedding)
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        if self.health_check().await {
            Ok(())
        } else {
            bail!("Ollama is not reachable at {}", self.base_url)
        }
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(response.response)
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        Embedder::warm_up(self).await
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
        assert_eq!(client.generation_model(), "qwen2.5:7b-instruct");
        assert_eq!(client.embedding_model(), "nomic-embed-text");
    }

    #[test]
    fn test_client_with_config_strips_trailing_slash() {
        let config = OllamaConfig {
            url: "http://localhost:11434/".to_string(),
            generation_model: "llama2:7b".to_string(),
            ..Default::default()
        };
        let client = OllamaClient::with_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.generation_model(), "llama2:7b");
    }

    #[test]
    fn test_generate_request_is_not_streaming() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
    }
}
