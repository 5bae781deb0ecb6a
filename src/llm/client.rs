//! HTTP completion client.
//!
//! Supports Ollama for local inference and OpenAI-compatible APIs
//! (OpenAI, Groq, Together.ai). The analysis pipeline only sees the
//! [`CompletionBackend`] trait, so transports are swappable in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::prompts::PromptTemplate;

/// Errors that can occur during completion calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to reach the completion service.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The service answered with an error status.
    #[error("API error: {0}")]
    Api(String),
    /// The service answered but the payload was not understandable.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The client is disabled by configuration.
    #[error("LLM is disabled")]
    Disabled,
}

impl LlmError {
    /// Whether this is a transport-level failure (as opposed to a
    /// payload problem). Only transport failures trip the fatal path.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Api(_) | Self::Disabled)
    }
}

/// One completed call to the text-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Raw completion content.
    pub content: String,
    /// Usage units consumed by this call.
    pub tokens_used: u64,
    /// Identifier of the model that produced the content.
    pub model: String,
}

/// The completion-service seam the analysis pipeline calls through.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one completion call for the given template and stage input.
    async fn complete(&self, template: PromptTemplate, input: &str) -> Result<Completion, LlmError>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Configuration for the HTTP completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether completion calls are enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Provider (ollama or openai).
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model to use for analysis calls.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model to fall back to when the primary call fails at the
    /// transport level. Tried once per call.
    #[serde(default)]
    pub fallback_model: Option<String>,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_enabled() -> bool {
    true
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            fallback_model: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Apply environment overrides.
    ///
    /// Env vars: DOCSIGHT_PROVIDER, DOCSIGHT_ENDPOINT, DOCSIGHT_MODEL,
    /// DOCSIGHT_API_KEY; OLLAMA_HOST is honored for the Ollama provider
    /// when no explicit endpoint is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("DOCSIGHT_PROVIDER") {
            if let Some(provider) = LlmProvider::from_str(&val) {
                self.provider = provider;
            }
        }
        if let Ok(endpoint) = std::env::var("DOCSIGHT_ENDPOINT") {
            self.endpoint = endpoint;
        } else if self.provider == LlmProvider::Ollama {
            if let Ok(host) = std::env::var("OLLAMA_HOST") {
                self.endpoint = host;
            }
        }
        if let Ok(model) = std::env::var("DOCSIGHT_MODEL") {
            self.model = model;
        }
        if let Ok(key) = std::env::var("DOCSIGHT_API_KEY") {
            self.api_key = Some(key);
        }
        self
    }

    /// Get a provider-aware availability hint for error messages.
    pub fn availability_hint(&self) -> String {
        match self.provider {
            LlmProvider::Ollama => format!(
                "Ollama not available at {}. Make sure Ollama is running: ollama serve",
                self.endpoint
            ),
            LlmProvider::OpenAI => {
                if self.api_key.is_none() {
                    "API key not set. Set DOCSIGHT_API_KEY".to_string()
                } else {
                    format!("API not available at {}", self.endpoint)
                }
            }
        }
    }
}

/// Completion client speaking Ollama or OpenAI-compatible HTTP APIs.
pub struct HttpCompletionClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    total_tokens: u64,
}

impl HttpCompletionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 min timeout for slow models
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the completion service is available.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let url = match self.config.provider {
            LlmProvider::Ollama => format!("{}/api/tags", self.config.endpoint),
            LlmProvider::OpenAI => format!("{}/v1/models", self.config.endpoint),
        };
        let mut req = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List models the service reports as available.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        match self.config.provider {
            LlmProvider::Ollama => {
                let url = format!("{}/api/tags", self.config.endpoint);
                let resp = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| LlmError::Connection(e.to_string()))?;

                if !resp.status().is_success() {
                    return Err(LlmError::Api(format!("HTTP {}", resp.status())));
                }

                #[derive(Deserialize)]
                struct TagsResponse {
                    models: Vec<ModelInfo>,
                }

                #[derive(Deserialize)]
                struct ModelInfo {
                    name: String,
                }

                let tags: TagsResponse = resp
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(e.to_string()))?;

                Ok(tags.models.into_iter().map(|m| m.name).collect())
            }
            LlmProvider::OpenAI => {
                let url = format!("{}/v1/models", self.config.endpoint);
                let mut req = self.client.get(&url);
                if let Some(key) = &self.config.api_key {
                    req = req.bearer_auth(key);
                }
                let resp = req
                    .send()
                    .await
                    .map_err(|e| LlmError::Connection(e.to_string()))?;

                if !resp.status().is_success() {
                    return Err(LlmError::Api(format!("HTTP {}", resp.status())));
                }

                #[derive(Deserialize)]
                struct ModelsResponse {
                    data: Vec<ModelEntry>,
                }

                #[derive(Deserialize)]
                struct ModelEntry {
                    id: String,
                }

                let models: ModelsResponse = resp
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(e.to_string()))?;

                Ok(models.data.into_iter().map(|m| m.id).collect())
            }
        }
    }

    /// Call Ollama's generate endpoint with a rendered prompt.
    async fn call_ollama(&self, prompt: &str, model: &str) -> Result<Completion, LlmError> {
        let request = OllamaRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(Completion {
            content: ollama_resp.response,
            tokens_used: ollama_resp.prompt_eval_count + ollama_resp.eval_count,
            model: model.to_string(),
        })
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_openai(&self, prompt: &str, model: &str) -> Result<Completion, LlmError> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OpenAiResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("Response contained no choices".to_string()))?;

        let model = if parsed.model.is_empty() {
            model.to_string()
        } else {
            parsed.model
        };

        Ok(Completion {
            content,
            tokens_used: parsed.usage.total_tokens,
            model,
        })
    }

    async fn call_model(&self, prompt: &str, model: &str) -> Result<Completion, LlmError> {
        match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(prompt, model).await,
            LlmProvider::OpenAI => self.call_openai(prompt, model).await,
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    async fn complete(&self, template: PromptTemplate, input: &str) -> Result<Completion, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let prompt = template.render(input);
        debug!("Completion call: template={}, model={}", template, self.config.model);

        match self.call_model(&prompt, &self.config.model).await {
            Ok(completion) => Ok(completion),
            Err(err) if err.is_transport() => {
                let Some(fallback) = &self.config.fallback_model else {
                    return Err(err);
                };
                warn!(
                    "{} call failed with primary model {}: {}, trying {}",
                    template, self.config.model, err, fallback
                );
                self.call_model(&prompt, fallback).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert!(config.enabled);
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert!(config.endpoint.contains("11434"));
        assert!(config.fallback_model.is_none());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(LlmProvider::from_str("ollama"), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::from_str("groq"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("llamafile"), None);
    }

    #[test]
    fn test_transport_error_classification() {
        assert!(LlmError::Connection("x".into()).is_transport());
        assert!(LlmError::Api("x".into()).is_transport());
        assert!(LlmError::Disabled.is_transport());
        assert!(!LlmError::Parse("x".into()).is_transport());
    }

    #[test]
    fn test_availability_hint_mentions_endpoint() {
        let config = LlmConfig::default();
        assert!(config.availability_hint().contains("11434"));
    }
}
