//! Background removal of expired cache entries.

use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::{error, info};

use crate::domain::ports::outbound::{ResponseCache, SearchCache};

/// Sweeps both caches every `interval` until the task is dropped.
///
/// Sweep errors are logged and the loop carries on.
pub async fn run_cache_sweeper(
    response_cache: Arc<dyn ResponseCache>,
    search_cache: Arc<dyn SearchCache>,
    interval: Duration,
) {
    info!(
        interval_secs = interval.as_secs(),
        "Cache sweeper background task started"
    );

    let mut ticker = tokio::time::interval(interval);

    // Skip the first immediate tick to let the app fully start
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep_once(response_cache.as_ref(), search_cache.as_ref()).await;
    }
}

pub(crate) async fn sweep_once(response_cache: &dyn ResponseCache, search_cache: &dyn SearchCache) {
    let now = OffsetDateTime::now_utc();

    let responses = match response_cache.sweep(now).await {
        Ok(removed) => removed,
        Err(e) => {
            error!(error = %e, "Response cache sweep failed");
            0
        }
    };
    let searches = match search_cache.sweep(now).await {
        Ok(removed) => removed,
        Err(e) => {
            error!(error = %e, "Search cache sweep failed");
            0
        }
    };

    info!(
        response_entries = responses,
        search_entries = searches,
        "Cache sweep completed"
    );
}
