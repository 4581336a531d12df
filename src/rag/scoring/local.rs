// Local fragment scoring: embed caller-supplied notes and compare to the question
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::Embedder;
use crate::rag::scoring::similarity;
use crate::rag::types::{sort_by_score_desc, ContextItem, LocalFragment};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Score assigned to a fragment whose embedding failed
pub const FALLBACK_SCORE: f32 = 0.0;

/// Fragment embeddings in flight at once unless configured otherwise
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Scores local fragments against a query embedding.
///
/// Fragment embeddings are requested concurrently, at most `max_concurrent`
/// at a time. A failed, timed-out or non-finite embedding does not fail the
/// request: the fragment is kept with [`FALLBACK_SCORE`].
pub struct LocalFragmentScorer {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
    max_concurrent: usize,
    telemetry: Option<TelemetryCollector>,
}

impl LocalFragmentScorer {
    pub fn new(embedder: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self {
            embedder,
            timeout,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            telemetry: None,
        }
    }

    /// Zero is treated as one
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Embed and score every non-empty fragment, sorted by descending score.
    /// Fragments whose trimmed text is empty are dropped.
    pub async fn score_fragments(
        &self,
        fragments: &[LocalFragment],
        query_vector: &[f32],
    ) -> Vec<ContextItem> {
        let start = Instant::now();

        let pending: Vec<_> = fragments
            .iter()
            .enumerate()
            .filter(|(_, fragment)| !fragment.text.trim().is_empty())
            .map(|(index, fragment)| self.score_one(index, fragment, query_vector))
            .collect();

        let mut items: Vec<ContextItem> = stream::iter(pending)
            .buffered(self.max_concurrent)
            .collect()
            .await;
        sort_by_score_desc(&mut items);

        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::StageCompleted {
                stage: "local_scoring".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        items
    }

    async fn score_one(
        &self,
        index: usize,
        fragment: &LocalFragment,
        query_vector: &[f32],
    ) -> ContextItem {
        let text = fragment.text.trim();

        let score = match tokio::time::timeout(self.timeout, self.embedder.embed(text)).await {
            Ok(Ok(vector)) if vector.iter().any(|x| !x.is_finite()) => {
                self.fallback(index, "embedding contains non-finite values");
                FALLBACK_SCORE
            }
            Ok(Ok(vector)) => similarity(&vector, query_vector),
            Ok(Err(e)) => {
                self.fallback(index, &e.to_string());
                FALLBACK_SCORE
            }
            Err(_) => {
                self.fallback(
                    index,
                    &format!("timed out after {}ms", self.timeout.as_millis()),
                );
                FALLBACK_SCORE
            }
        };

        let mut item = ContextItem::local(text, score);
        item.title = fragment.note_title.clone();
        item.identifier = fragment.note_id;
        item
    }

    fn fallback(&self, index: usize, reason: &str) {
        tracing::warn!(fragment = index, %reason, "local fragment embedding failed, scoring 0.0");
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::FragmentFallback {
                index,
                reason: reason.to_string(),
            });
        }
    }
}
