//! Triage model port (outbound).

use async_trait::async_trait;

use crate::domain::{models::TokenUsage, ModelError};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Stable instructions, sent as a cacheable system block.
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Outbound port for the paid language model that classifies issues.
#[async_trait]
pub trait TriageModel: Send + Sync + 'static {
    /// Model identifier, used for pricing.
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}
