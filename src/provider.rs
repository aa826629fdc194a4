//! AI provider gateway.
//!
//! The scan pipeline only ever sees the [`AiProvider`] trait. Concrete
//! backends live here and are picked by name through [`create_provider`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ProviderError;

/// Prompt sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiQueryRequest {
    pub query: String,
    pub domain: String,
}

impl AiQueryRequest {
    pub fn new(query: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            domain: domain.into(),
        }
    }
}

/// Provider answer with its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiQueryResponse {
    pub content: String,
    pub sources: Vec<String>,
    pub provider: String,
}

/// Single-capability AI backend.
///
/// Implementations must return an error for any non-success upstream
/// response; callers never swallow it.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, request: &AiQueryRequest) -> Result<AiQueryResponse, ProviderError>;
}

/// Build the provider named in the configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn AiProvider>, ProviderError> {
    match config.ai_provider.as_str() {
        PerplexityProvider::NAME => Ok(Arc::new(PerplexityProvider::from_config(config)?)),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

// =====================
// Perplexity
// =====================

/// Perplexity chat-completions backend
#[derive(Clone)]
pub struct PerplexityProvider {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<ChatChoice>>,
    #[serde(default)]
    citations: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl PerplexityProvider {
    pub const NAME: &'static str = "perplexity";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.perplexity.ai".to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        if config.perplexity_api_key.is_empty() {
            return Err(ProviderError::Config("PERPLEXITY_API_KEY not set".into()));
        }
        Ok(Self::new(&config.perplexity_api_key, &config.perplexity_model)
            .with_base_url(&config.perplexity_base_url))
    }

    /// Set a custom base URL (proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_query_response(&self, body: ChatResponse) -> AiQueryResponse {
        let content = body
            .choices
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        AiQueryResponse {
            content,
            sources: body.citations.unwrap_or_default(),
            provider: Self::NAME.to_string(),
        }
    }
}

#[async_trait]
impl AiProvider for PerplexityProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn query(&self, request: &AiQueryRequest) -> Result<AiQueryResponse, ProviderError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.query,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, domain = %request.domain, "Perplexity request failed");
                ProviderError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, domain = %request.domain, "Perplexity API error");
            return Err(ProviderError::Api {
                provider: Self::NAME.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(
            model = %self.model,
            domain = %request.domain,
            duration_ms = start.elapsed().as_millis() as u64,
            "Perplexity chat completion"
        );

        Ok(self.to_query_response(parsed))
    }
}
