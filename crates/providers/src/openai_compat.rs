//! OpenAI-compatible completion provider.
//!
//! Speaks the `/v1/chat/completions` dialect. The design expects exactly
//! one candidate continuation per call; a response with any other choice
//! count is a provider failure, not something to guess around.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use threadloom_config::ProviderConfig;
use threadloom_core::{CompletionProvider, PromptBlock, PromptRole, ProviderError};

/// A provider for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            client,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    /// Build a provider from the app configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key: set provider.api_key, THREADLOOM_API_KEY, or OPENAI_API_KEY".into(),
            )
        })?;
        Ok(
            Self::new("openai", config.api_url.clone(), api_key, config.model.clone())
                .with_temperature(config.temperature),
        )
    }

    fn to_api_messages(blocks: &[PromptBlock]) -> Vec<ApiMessage> {
        blocks
            .iter()
            .map(|block| ApiMessage {
                role: match block.role {
                    PromptRole::System => "system".into(),
                    PromptRole::User => "user".into(),
                },
                content: block.text.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, blocks: &[PromptBlock]) -> Result<String, ProviderError> {
        let request = ApiRequest {
            model: self.model.clone(),
            messages: Self::to_api_messages(blocks),
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::Timeout(err.to_string())
                } else {
                    ProviderError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Network(format!("invalid response body: {err}")))?;

        if let Some(usage) = &payload.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        match payload.choices.as_slice() {
            [choice] => Ok(choice.message.content.clone()),
            choices => Err(ProviderError::UnexpectedCandidates {
                count: choices.len(),
            }),
        }
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
