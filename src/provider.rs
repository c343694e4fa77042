//! Model Provider
//!
//! OpenAI-compatible chat completion client and the adapter that backs capabilities with it.
//! Works against hosted endpoints as well as local servers speaking the same API.

use crate::capability::{with_timeout, CapabilityId, CapabilityInvoker, CapabilityRegistry};
use crate::error::CapabilityError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL; defaults to the OpenAI API
    #[serde(default)]
    pub endpoint: Option<String>,

    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.api_key_env.trim().is_empty() {
            return Err("api_key_env must not be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(format!("endpoint '{}' must be an http(s) URL", endpoint));
            }
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("temperature {} outside 0.0-2.0", temperature));
            }
        }
        Ok(())
    }

    /// Build a client, reading the key from `api_key_env`.
    ///
    /// A missing key is only an error for the default hosted endpoint; local servers
    /// usually run without one.
    pub fn build_client(&self) -> Result<OpenAIClient, CapabilityError> {
        let api_key = match std::env::var(&self.api_key_env) {
            Ok(key) => Some(key),
            Err(_) if self.endpoint.is_some() => None,
            Err(_) => {
                return Err(CapabilityError::Provider(format!(
                    "API key variable {} is not set",
                    self.api_key_env
                )))
            }
        };
        OpenAIClient::new(self.model.clone(), api_key, self.endpoint.clone())
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature.or(Some(1.0)),
            max_tokens: self.max_tokens,
            ..CompletionOptions::default()
        }
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0, default: 1.0
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: None,
            stop: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, CapabilityError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

// OpenAI-compatible request/response bodies
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn map_status(status: u16, detail: &str) -> CapabilityError {
    match status {
        401 | 403 => CapabilityError::Rejected(format!("authentication failed: {}", detail)),
        404 => CapabilityError::Rejected(format!("model not found: {}", detail)),
        429 => CapabilityError::Provider(format!("rate limit exceeded: {}", detail)),
        _ => CapabilityError::Provider(format!("request failed with status {}: {}", status, detail)),
    }
}

fn map_http_error(error: reqwest::Error) -> CapabilityError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        CapabilityError::Transport(format!("request timeout: {}", error))
    } else if error.is_connect() {
        CapabilityError::Transport(format!("connection error: {}", error))
    } else {
        CapabilityError::Transport(format!("HTTP error: {}", error))
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, CapabilityError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| CapabilityError::Transport(format!("failed to create HTTP client: {}", e)))
}

/// Client for any OpenAI-compatible chat completion endpoint
pub struct OpenAIClient {
    client: Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, CapabilityError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            model,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, CapabilityError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|msg| OpenAIMessage {
                    role: role_to_string(msg.role).to_string(),
                    content: msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status, &error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Provider(format!("failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::Provider("no choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: completion.model,
            usage: completion.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Backs every capability with one model provider.
///
/// Each call sends the capability's role as the system message and the rendered
/// instruction as the user message, bounded by the invocation timeout.
pub struct ProviderInvoker {
    client: Arc<dyn ModelProviderClient>,
    registry: Arc<CapabilityRegistry>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderInvoker {
    pub fn new(
        client: Arc<dyn ModelProviderClient>,
        registry: Arc<CapabilityRegistry>,
        options: CompletionOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            options,
            timeout,
        }
    }

    fn system_prompt(&self, capability: &CapabilityId) -> String {
        match self.registry.get(capability) {
            Some(descriptor) => format!(
                "You are the {} capability of a story studio. {}",
                descriptor.label, descriptor.description
            ),
            None => format!("You are the {} capability of a story studio.", capability),
        }
    }
}

#[async_trait]
impl CapabilityInvoker for ProviderInvoker {
    async fn invoke(
        &self,
        capability: &CapabilityId,
        instruction: &str,
    ) -> Result<String, CapabilityError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt(capability)),
            ChatMessage::user(instruction),
        ];
        let options = self.options.clone();
        let client = self.client.clone();

        let started = std::time::Instant::now();
        let reply = with_timeout(capability, self.timeout, async move {
            client.complete(messages, options).await.map(|r| r.content)
        })
        .await?;
        debug!(
            capability = %capability,
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = reply.len(),
            "Capability invoked"
        );
        Ok(reply)
    }
}
