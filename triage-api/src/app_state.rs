use std::sync::Arc;

use crate::{
    domain::ports::inbound::{BatchService, TriageService},
    services::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub triage_service: Arc<dyn TriageService>,
    pub batch_service: Arc<dyn BatchService>,
    pub analyze_limiter: Arc<RateLimiter>,
    pub batch_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        triage_service: Arc<dyn TriageService>,
        batch_service: Arc<dyn BatchService>,
        analyze_limiter: RateLimiter,
        batch_limiter: RateLimiter,
    ) -> Self {
        Self {
            triage_service,
            batch_service,
            analyze_limiter: Arc::new(analyze_limiter),
            batch_limiter: Arc::new(batch_limiter),
        }
    }
}
