use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::{
    models::TokenUsage,
    ports::outbound::{ModelReply, ModelRequest, TriageModel},
    ModelError,
};

/// Mock model that replays scripted replies.
///
/// # Examples
///
/// ```ignore
/// // Same reply every time
/// let model = MockTriageModel::new().returning(r#"{"primary_category": "bug", ...}"#);
///
/// // Scripted replies first, then the fixed one
/// let model = MockTriageModel::new()
///     .with_sequence(vec![Ok("garbage".into()), Err(ModelError::unknown("boom"))])
///     .returning(VALID_REPLY);
/// ```
#[derive(Clone)]
pub struct MockTriageModel {
    model: String,
    fixed: Option<String>,
    sequence: Arc<Mutex<VecDeque<Result<String, ModelError>>>>,
    usage: TokenUsage,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockTriageModel {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            fixed: None,
            sequence: Arc::default(),
            usage: TokenUsage {
                input_tokens: 1_200,
                output_tokens: 300,
                ..Default::default()
            },
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::default(),
        }
    }
}

impl MockTriageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` once any scripted replies are used up.
    pub fn returning(mut self, text: &str) -> Self {
        self.fixed = Some(text.to_string());
        self
    }

    pub fn with_sequence(self, replies: Vec<Result<String, ModelError>>) -> Self {
        self.sequence.lock().unwrap().extend(replies);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TriageModel for MockTriageModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.sequence.lock().unwrap().pop_front();
        let text = match scripted {
            Some(reply) => reply?,
            None => self
                .fixed
                .clone()
                .ok_or_else(|| ModelError::unknown("no reply scripted"))?,
        };

        Ok(ModelReply {
            text,
            usage: self.usage,
            model: self.model.clone(),
        })
    }
}
