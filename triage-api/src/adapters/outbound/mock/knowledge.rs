use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{models::KnowledgeHit, ports::outbound::KnowledgeSource, KnowledgeError};

#[derive(Clone)]
pub struct MockKnowledgeSource {
    name: String,
    hits: Vec<KnowledgeHit>,
    fail: bool,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
}

impl MockKnowledgeSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hits: Vec::new(),
            fail: false,
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_hits(mut self, hits: Vec<KnowledgeHit>) -> Self {
        self.hits = hits;
        self
    }

    /// Every search returns a source error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }
}

#[async_trait]
impl KnowledgeSource for MockKnowledgeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(KnowledgeError::Source {
                source_name: self.name.clone(),
                message: "HTTP 503".to_string(),
            });
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}
