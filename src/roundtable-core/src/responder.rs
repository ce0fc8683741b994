//! Language responder: turns discussion context into a persona's next line.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::DiscussionError;
use crate::transcript::{ContextLine, TurnRole};

/// External language-model collaborator.
#[async_trait]
pub trait LanguageResponder: Send + Sync {
    /// Produce the next utterance for the persona described by
    /// `persona_prompt`, given the ordered discussion so far.
    async fn respond(
        &self,
        context: &[ContextLine],
        persona_prompt: &str,
    ) -> Result<String, DiscussionError>;
}

/// Endpoint settings for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
}

impl ApiEndpoint {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

/// Chat-completions responder for any OpenAI-compatible endpoint.
pub struct OpenAIResponder {
    client: Client<OpenAIConfig>,
    model: ModelConfig,
}

impl OpenAIResponder {
    pub fn new(endpoint: &ApiEndpoint, model: ModelConfig) -> Result<Self, DiscussionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(model.timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DiscussionError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&endpoint.api_key)
            .with_api_base(&endpoint.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model,
        })
    }
}

#[async_trait]
impl LanguageResponder for OpenAIResponder {
    async fn respond(
        &self,
        context: &[ContextLine],
        persona_prompt: &str,
    ) -> Result<String, DiscussionError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model.name)
            .temperature(self.model.temperature)
            .max_completion_tokens(self.model.max_tokens)
            .messages(build_messages(context, persona_prompt))
            .build()?;

        debug!(turns = context.len(), model = %self.model.name, "Requesting completion");

        // Exponential backoff: 1s, 2s, 4s
        let max_retries = self.model.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(1 << (attempt - 1))).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default();
                    return Ok(content);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, max_retries, "Completion failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(DiscussionError::ResponderFailed(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown API error after retries".to_string()),
        ))
    }
}

/// Persona prompt as the system message, then one message per turn.
/// Persona turns are the model's own; everything else is user input.
fn build_messages(context: &[ContextLine], persona_prompt: &str) -> Vec<ChatCompletionRequestMessage> {
    let mut messages = Vec::with_capacity(context.len() + 1);
    messages.push(ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessage {
            content: persona_prompt.to_string().into(),
            name: None,
        },
    ));

    for line in context {
        let content = line.rendered();
        let message = match line.role {
            TurnRole::Persona => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(content.into()),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            TurnRole::Human | TurnRole::Moderator => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: content.into(),
                    name: None,
                })
            }
        };
        messages.push(message);
    }

    messages
}
