// End-to-end ask pipeline: validate -> embed -> retrieve -> rank -> answer
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AskError, Result};
use crate::models::{Embedder, Generator, OllamaClient};
use crate::rag::context::{AssemblerConfig, ContextAssembler, PromptTemplate};
use crate::rag::retrieval::{MatchStore, RemoteMatchClient};
use crate::rag::scoring::local::DEFAULT_MAX_CONCURRENT;
use crate::rag::scoring::LocalFragmentScorer;
use crate::rag::state::{AskEvent, AskState};
use crate::rag::types::{AskResponse, Question, RetrievalRequest, RetrievalResult};
use crate::session::{FileTranscript, NoopTranscript, TranscriptEntry, TranscriptSink};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Used when a request does not name a match count
    pub default_match_count: usize,
    pub assembler: AssemblerConfig,
    /// Per embedding call, question and fragments alike
    pub embedding_timeout: Duration,
    /// Fragment embeddings in flight per request
    pub max_concurrent_embeddings: usize,
    pub generation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_match_count: 5,
            assembler: AssemblerConfig::default(),
            embedding_timeout: Duration::from_secs(30),
            max_concurrent_embeddings: DEFAULT_MAX_CONCURRENT,
            generation_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let model_timeout = Duration::from_secs(config.ollama.timeout_secs);
        Self {
            default_match_count: config.remote.match_count,
            assembler: AssemblerConfig {
                top_k: config.retrieval.top_k,
                template: PromptTemplate::default(),
            },
            embedding_timeout: model_timeout,
            max_concurrent_embeddings: config.ollama.max_concurrent_embeddings,
            generation_timeout: model_timeout,
        }
    }
}

/// Answer plus the retrieval that produced it
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub request_id: String,
    pub response: AskResponse,
    pub retrieval: RetrievalResult,
}

/// Request-level coordinator. Collaborators are injected at construction and
/// shared read-only across concurrent requests.
pub struct AskPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn MatchStore>,
    transcript: Arc<dyn TranscriptSink>,
    local_scorer: LocalFragmentScorer,
    assembler: ContextAssembler,
    telemetry: TelemetryCollector,
    config: PipelineConfig,
}

/// Tracks one request through the state machine
struct Progress<'a> {
    state: AskState,
    telemetry: &'a TelemetryCollector,
}

impl<'a> Progress<'a> {
    fn new(telemetry: &'a TelemetryCollector) -> Self {
        Self {
            state: AskState::Received,
            telemetry,
        }
    }

    fn advance(&mut self, event: AskEvent) -> Result<()> {
        let next = self.state.transition(event)?;
        tracing::debug!(from = self.state.display_name(), to = next.display_name(), "state transition");
        self.telemetry.record(TelemetryEvent::StateTransition {
            from: self.state.display_name().to_string(),
            to: next.display_name().to_string(),
            timestamp: Instant::now(),
        });
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` and hand the error back
    fn fail(&mut self, err: AskError) -> AskError {
        if !self.state.is_terminal() {
            let _ = self.advance(AskEvent::Fail);
        }
        err
    }
}

impl AskPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn MatchStore>,
        transcript: Arc<dyn TranscriptSink>,
        config: PipelineConfig,
    ) -> Self {
        let telemetry = TelemetryCollector::new();
        let local_scorer = LocalFragmentScorer::new(Arc::clone(&embedder), config.embedding_timeout)
            .with_max_concurrent(config.max_concurrent_embeddings)
            .with_telemetry(telemetry.clone());

        Self {
            embedder,
            generator,
            store,
            transcript,
            local_scorer,
            assembler: ContextAssembler::with_config(config.assembler.clone()),
            telemetry,
            config,
        }
    }

    /// Build the production pipeline: Ollama for both models, the remote
    /// match store from `[remote]`, and the transcript file from `[transcript]`
    pub fn from_config(config: &Config) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::with_config(&config.ollama)?);
        let store = Arc::new(RemoteMatchClient::new(&config.remote)?);
        let transcript: Arc<dyn TranscriptSink> = if config.transcript.enabled {
            Arc::new(FileTranscript::new(config.transcript.path.clone()))
        } else {
            Arc::new(NoopTranscript)
        };

        Ok(Self::new(
            ollama.clone(),
            ollama,
            store,
            transcript,
            PipelineConfig::from_config(config),
        ))
    }

    /// Check both models before serving
    pub async fn warm_up(&self) -> Result<()> {
        self.embedder
            .warm_up()
            .await
            .map_err(|e| AskError::EmbeddingError(format!("warm-up failed: {:#}", e)))?;
        self.generator
            .warm_up()
            .await
            .map_err(|e| AskError::GenerationError(format!("warm-up failed: {:#}", e)))?;
        Ok(())
    }

    /// Answer a question
    pub async fn ask(&self, request: RetrievalRequest) -> Result<AskResponse> {
        self.ask_detailed(request).await.map(|outcome| outcome.response)
    }

    /// Answer a question and return the ranked context alongside
    pub async fn ask_detailed(&self, request: RetrievalRequest) -> Result<AskOutcome> {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        self.telemetry.record(TelemetryEvent::RequestStarted {
            request_id: request_id.clone(),
            timestamp: start,
        });

        let span = tracing::info_span!("ask", request_id = %request_id);
        let result = self.run(&request_id, &request).instrument(span).await;

        self.telemetry.record(TelemetryEvent::RequestFinished {
            request_id,
            success: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
        result
    }

    async fn run(&self, request_id: &str, request: &RetrievalRequest) -> Result<AskOutcome> {
        let mut progress = Progress::new(&self.telemetry);

        // Validated
        let question = Question::parse(&request.question).map_err(|e| progress.fail(e))?;
        let match_count = request.match_count.unwrap_or(self.config.default_match_count);
        if match_count == 0 {
            return Err(progress.fail(AskError::InvalidInput(
                "match_count must be positive".to_string(),
            )));
        }
        progress.advance(AskEvent::QuestionAccepted)?;

        // Embedded
        let query_vector = self
            .embed_question(&question)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(AskEvent::QueryEmbedded)?;

        // Retrieved: remote search and local scoring are independent
        let retrieval_start = Instant::now();
        let (remote, local_items) = tokio::join!(
            self.store
                .search(&query_vector, match_count, request.scope_filter),
            self.local_scorer
                .score_fragments(&request.local_fragments, &query_vector),
        );
        let remote_items = remote.map_err(|e| {
            tracing::error!(error = %e, "remote match store failed");
            progress.fail(e)
        })?;
        self.stage_completed("retrieval", retrieval_start);
        progress.advance(AskEvent::ContextRetrieved)?;

        // Ranked
        let retrieval = self.assembler.assemble(remote_items, local_items, &question);
        tracing::debug!(contexts = retrieval.items.len(), "context assembled");
        progress.advance(AskEvent::ContextRanked)?;

        // Answered
        let message = self
            .generate(&retrieval.prompt)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(AskEvent::AnswerGenerated)?;
        tracing::debug!(length = message.len(), "answer generated");

        self.persist_transcript(&question, &retrieval, &message).await;

        Ok(AskOutcome {
            request_id: request_id.to_string(),
            response: AskResponse { message },
            retrieval,
        })
    }

    async fn embed_question(&self, question: &Question) -> Result<Vec<f32>> {
        let start = Instant::now();
        let timeout = self.config.embedding_timeout;

        let vector = match tokio::time::timeout(timeout, self.embedder.embed(question.as_str())).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                return Err(AskError::EmbeddingError(format!(
                    "question embedding failed: {:#}",
                    e
                )))
            }
            Err(_) => {
                return Err(AskError::EmbeddingError(format!(
                    "question embedding timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };

        self.stage_completed("embedding", start);
        Ok(vector)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let timeout = self.config.generation_timeout;

        let text = match tokio::time::timeout(timeout, self.generator.generate(prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(AskError::GenerationError(format!("{:#}", e))),
            Err(_) => {
                return Err(AskError::GenerationError(format!(
                    "generation timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };

        self.stage_completed("generation", start);
        Ok(text)
    }

    async fn persist_transcript(&self, question: &Question, retrieval: &RetrievalResult, response: &str) {
        let entry = TranscriptEntry {
            question: question.to_string(),
            timestamp: chrono::Local::now(),
            contexts_used: retrieval.items.len(),
            prompt: retrieval.prompt.clone(),
            response: response.to_string(),
        };

        if let Err(e) = self.transcript.record(&entry).await {
            let reason = format!("{:#}", e);
            tracing::warn!(error = %reason, "failed to persist transcript");
            self.telemetry.record(TelemetryEvent::TranscriptFailed { reason });
        }
    }

    fn stage_completed(&self, stage: &str, start: Instant) {
        self.telemetry.record(TelemetryEvent::StageCompleted {
            stage: stage.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }

    /// Log the telemetry summary; the pipeline serves no requests afterwards
    pub fn shutdown(self) {
        tracing::info!(summary = %self.telemetry.summary(), "ask pipeline shut down");
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_match_count, 5);
        assert_eq!(config.assembler.top_k, 8);
    }

    #[test]
    fn test_pipeline_config_from_config() {
        let mut config = Config::default();
        config.retrieval.top_k = 3;
        config.remote.match_count = 9;
        config.ollama.timeout_secs = 7;
        config.ollama.max_concurrent_embeddings = 3;

        let pipeline_config = PipelineConfig::from_config(&config);
        assert_eq!(pipeline_config.assembler.top_k, 3);
        assert_eq!(pipeline_config.default_match_count, 9);
        assert_eq!(pipeline_config.generation_timeout, Duration::from_secs(7));
        assert_eq!(pipeline_config.max_concurrent_embeddings, 3);
    }

    #[test]
    fn test_from_config_without_remote() {
        let mut config = Config::default();
        config.transcript.enabled = false;
        let pipeline = AskPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.telemetry().get_stats().requests, 0);
    }
}
