//! Content generation collaborator.
//!
//! Generated content is untrusted input. Implementations return raw JSON or
//! an [`Error::ExternalContent`]; shaping it into typed values happens in
//! [`crate::validation`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use upnext_core::{Error, Result};

/// What the collaborator is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// A list of milestone suggestions toward a career goal
    GenerateTimeline,
    /// A scored assessment of the learner's progress
    EvaluateProgress,
    /// Prioritized next actions, courses and projects
    RecommendNextSteps,
    /// A short encouraging message
    MotivationalMessage,
}

impl PromptKind {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::GenerateTimeline => "generate_timeline",
            PromptKind::EvaluateProgress => "evaluate_progress",
            PromptKind::RecommendNextSteps => "recommend_next_steps",
            PromptKind::MotivationalMessage => "motivational_message",
        }
    }
}

/// Produces structured content for a prompt kind and context.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate content. The result has not been validated.
    async fn generate(&self, kind: PromptKind, context: &Value) -> Result<Value>;
}

/// Settings for [`HttpContentGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Endpoint receiving `{kind, context}`
    pub url: String,
    /// Optional bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

/// Generator backed by an HTTP endpoint.
pub struct HttpContentGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl HttpContentGenerator {
    /// Create a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, kind: PromptKind, context: &Value) -> Result<Value> {
        let payload = json!({ "kind": kind, "context": context });

        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::ExternalContent(format!("generator request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ExternalContent(format!(
                "generator returned {status}: {text}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::ExternalContent(format!("failed to read generator response: {e}")))?;
        debug!(kind = kind.as_str(), bytes = text.len(), "Generator answered");

        extract_json(&text).ok_or_else(|| {
            Error::ExternalContent(format!("{} response is not JSON", kind.as_str()))
        })
    }
}

/// Parse `text` as JSON, or the outermost object or array embedded in it.
///
/// Models often wrap their JSON in prose or code fences.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }
    let mut spans: Vec<(usize, usize)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| Some((text.find(open)?, text.rfind(close)?)))
        .filter(|(start, end)| start < end)
        .collect();
    // Whichever bracket opens first is the outermost value.
    spans.sort_unstable();
    spans
        .into_iter()
        .find_map(|(start, end)| serde_json::from_str(&text[start..=end]).ok())
}

/// Generator answering from canned responses.
///
/// Kinds without a response fail with [`Error::ExternalContent`], which
/// callers turn into defaults. With no responses at all it works as an
/// offline generator.
#[derive(Debug, Clone, Default)]
pub struct StaticContentGenerator {
    responses: BTreeMap<PromptKind, Value>,
}

impl StaticContentGenerator {
    /// Generator with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `kind` with `value`.
    pub fn with(mut self, kind: PromptKind, value: Value) -> Self {
        self.responses.insert(kind, value);
        self
    }
}

#[async_trait]
impl ContentGenerator for StaticContentGenerator {
    async fn generate(&self, kind: PromptKind, _context: &Value) -> Result<Value> {
        self.responses
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::ExternalContent(format!("no content for {}", kind.as_str())))
    }
}
