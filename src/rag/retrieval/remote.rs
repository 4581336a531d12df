// Remote vector-match store client
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::errors::{AskError, Result};
use crate::rag::types::{sort_by_score_desc, ContextItem};

/// Field aliases accepted for a row's text, in priority order
const TEXT_FIELDS: [&str; 2] = ["chunk_text", "content"];
/// Field aliases accepted for a row's score, in priority order
const SCORE_FIELDS: [&str; 2] = ["similarity", "score"];

/// Ranked search over a remote store
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn search(
        &self,
        query_vector: &[f32],
        match_count: usize,
        scope_filter: Option<i64>,
    ) -> Result<Vec<ContextItem>>;
}

/// Endpoint and credential of a configured store
#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    api_key: String,
}

/// Client for the store's match RPC (`POST {url}/rest/v1/rpc/{match_fn}`).
///
/// Without both url and key the client is disabled and every search returns
/// an empty sequence.
pub struct RemoteMatchClient {
    client: Client,
    endpoint: Option<Endpoint>,
}

impl RemoteMatchClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = match (&config.url, &config.api_key) {
            (Some(url), Some(api_key)) => Some(Endpoint {
                url: format!(
                    "{}/rest/v1/rpc/{}",
                    url.trim_end_matches('/'),
                    config.match_fn
                ),
                api_key: api_key.clone(),
            }),
            _ => None,
        };

        Ok(Self { client, endpoint })
    }

    /// A client that never contacts a store
    pub fn disabled() -> Result<Self> {
        Self::new(&RemoteConfig::default())
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Full RPC URL when configured
    pub fn rpc_url(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.url.as_str())
    }
}

#[async_trait]
impl MatchStore for RemoteMatchClient {
    async fn search(
        &self,
        query_vector: &[f32],
        match_count: usize,
        scope_filter: Option<i64>,
    ) -> Result<Vec<ContextItem>> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => {
                tracing::debug!("remote match store not configured, skipping");
                return Ok(Vec::new());
            }
        };

        let mut payload = json!({
            "query_embedding": query_vector,
            "match_count": match_count,
        });
        if let Some(course_id) = scope_filter {
            payload["filter_course_id"] = json!(course_id);
        }

        let response = self
            .client
            .post(&endpoint.url)
            .header("apikey", &endpoint.api_key)
            .bearer_auth(&endpoint.api_key)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AskError::upstream_transport(format!("match request timed out: {}", e))
                } else {
                    AskError::upstream_transport(format!("match request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AskError::upstream_transport(format!("failed to read match response: {}", e)))?;

        if !status.is_success() {
            return Err(AskError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = serde_json::from_str(&body).map_err(|e| AskError::UpstreamError {
            status: status.as_u16(),
            body: format!("malformed match response: {}", e),
        })?;

        let items = decode_matches(&data);
        tracing::debug!(count = items.len(), "remote matches decoded");
        Ok(items)
    }
}

/// Decode a match response into context items sorted by descending score.
///
/// Anything but an array yields nothing. Rows that are not objects, or whose
/// text is missing or empty, are skipped.
pub fn decode_matches(data: &Value) -> Vec<ContextItem> {
    let rows = match data.as_array() {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    let mut items: Vec<ContextItem> = rows
        .iter()
        .filter_map(Value::as_object)
        .filter_map(decode_row)
        .collect();

    sort_by_score_desc(&mut items);
    items
}

fn decode_row(row: &Map<String, Value>) -> Option<ContextItem> {
    let text = TEXT_FIELDS
        .iter()
        .filter_map(|field| row.get(*field).and_then(text_value))
        .find(|text| !text.trim().is_empty())?;

    let score = SCORE_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(score_value))
        .unwrap_or(0.0);

    let mut item = ContextItem::remote(text, score);
    item.course_id = row.get("course_id").and_then(Value::as_i64);
    item.metadata = row.get("metadata").and_then(Value::as_object).cloned();
    Some(item)
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-finite scores count as absent
fn score_value(value: &Value) -> Option<f32> {
    let score = match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}
