use async_trait::async_trait;
use tracing::debug;

use claude_client::{ClaudeClient, ClaudeError, MessageRequest, Usage};

use crate::domain::{
    models::TokenUsage,
    ports::outbound::{ModelReply, ModelRequest, TriageModel},
    ModelError,
};

/// Adapter that wraps the Claude client to implement the TriageModel port.
pub struct ClaudeTriageModel {
    client: ClaudeClient,
    model: String,
    temperature: Option<f32>,
}

impl ClaudeTriageModel {
    pub fn new(client: ClaudeClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl TriageModel for ClaudeTriageModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let mut message = MessageRequest::new(&self.model, request.max_tokens)
            .with_cached_system(&request.system)
            .with_user_message(&request.prompt);
        if let Some(temperature) = self.temperature {
            message = message.with_temperature(temperature);
        }

        let response = self
            .client
            .create_message(&message)
            .await
            .map_err(map_claude_error)?;
        debug!(
            model = %response.model,
            stop_reason = ?response.stop_reason,
            "Model reply received"
        );

        Ok(ModelReply {
            text: response.text(),
            usage: to_token_usage(response.usage),
            model: response.model,
        })
    }
}

fn to_token_usage(usage: Usage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        cache_read_tokens: usage.cache_read_input_tokens,
        cache_write_tokens: usage.cache_creation_input_tokens,
    }
}

fn map_claude_error(e: ClaudeError) -> ModelError {
    if e.is_retryable() {
        return ModelError::Unavailable {
            retry_after: e.retry_after(),
            message: e.to_string(),
        };
    }
    match e {
        ClaudeError::Api { .. } | ClaudeError::Config(_) => ModelError::Rejected(e.to_string()),
        ClaudeError::ParsingError(msg) => ModelError::unknown(msg),
        other => ModelError::unknown(other.to_string()),
    }
}
