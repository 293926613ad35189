//! Composition root. The only place that names concrete outbound adapters.

use std::sync::Arc;

use claude_client::{ClaudeClient, ClaudeError};
use knowledge_client::{GithubIssueSearch, KnowledgeFetchError, StackExchangeSearch};
use sqlx::PgPool;
use tracing::info;

use crate::{
    adapters::outbound::{
        claude::ClaudeTriageModel,
        knowledge::{GithubIssuesSource, StackOverflowSource},
        postgres::{
            PgCostLedger, PgIssueCatalog, PgResponseCache, PgSearchCache, PgSimilarityIndex,
            PgVerdictRepository,
        },
    },
    app_state::AppState,
    config::Settings,
    domain::{
        ports::outbound::{KnowledgeSource, ResponseCache, SearchCache},
        services::{BatchTriageService, TriageServiceImpl},
        triage::{CachedKnowledgeLookup, TriageEngine, TriagePorts},
    },
    services::RateLimiter,
};

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("LLM client: {0}")]
    Claude(#[from] ClaudeError),
    #[error("knowledge source: {0}")]
    Knowledge(#[from] KnowledgeFetchError),
}

/// Everything `main` needs after wiring: request state plus the caches the
/// sweeper task keeps tidy.
pub struct Wiring {
    pub app_state: AppState,
    pub response_cache: Arc<dyn ResponseCache>,
    pub search_cache: Arc<dyn SearchCache>,
}

pub fn build(pool: PgPool, settings: &Settings) -> Result<Wiring, FactoryError> {
    let catalog = Arc::new(PgIssueCatalog::new(pool.clone()));
    let verdicts = Arc::new(PgVerdictRepository::new(pool.clone()));
    let ledger = Arc::new(PgCostLedger::new(pool.clone()));
    let response_cache: Arc<dyn ResponseCache> = Arc::new(PgResponseCache::new(pool.clone()));
    let search_cache: Arc<dyn SearchCache> = Arc::new(PgSearchCache::new(pool.clone()));

    let knowledge = Arc::new(CachedKnowledgeLookup::new(
        knowledge_sources(settings)?,
        search_cache.clone(),
        settings.knowledge_config(),
    ));

    let ports = TriagePorts {
        index: Arc::new(PgSimilarityIndex::new(pool)),
        model: Arc::new(triage_model(settings)?),
        knowledge,
        response_cache: response_cache.clone(),
        ledger: ledger.clone(),
        verdicts: verdicts.clone(),
        catalog: catalog.clone(),
    };
    let engine = Arc::new(TriageEngine::new(ports, settings.engine_config()));

    let triage_service =
        TriageServiceImpl::new(catalog.clone(), verdicts, ledger, engine.clone());
    let batch_service =
        BatchTriageService::with_workers(catalog, engine, settings.triage.batch_workers);

    let app_state = AppState::new(
        Arc::new(triage_service),
        Arc::new(batch_service),
        RateLimiter::per_minute("analyze", settings.rate_limit.analyze_per_minute),
        RateLimiter::per_minute("batch", settings.rate_limit.batch_per_minute),
    );

    Ok(Wiring {
        app_state,
        response_cache,
        search_cache,
    })
}

fn triage_model(settings: &Settings) -> Result<ClaudeTriageModel, FactoryError> {
    let llm = &settings.llm;
    let mut client = ClaudeClient::new(&llm.api_key, &llm.api_version)?;
    if let Some(base_url) = &llm.base_url {
        client = client.with_base_url(base_url);
    }

    let model = ClaudeTriageModel::new(client, &llm.model);
    Ok(match llm.temperature {
        Some(temperature) => model.with_temperature(temperature),
        None => model,
    })
}

fn knowledge_sources(settings: &Settings) -> Result<Vec<Arc<dyn KnowledgeSource>>, FactoryError> {
    let knowledge = &settings.knowledge;
    let mut sources: Vec<Arc<dyn KnowledgeSource>> = Vec::new();

    if knowledge.stackoverflow.enabled {
        let mut client = StackExchangeSearch::new(knowledge.stackoverflow.key.clone())?;
        if let Some(base_url) = &knowledge.stackoverflow.base_url {
            client = client.with_base_url(base_url);
        }
        sources.push(Arc::new(StackOverflowSource::new(client)));
    }

    if knowledge.github.enabled {
        let mut client = GithubIssueSearch::new(knowledge.github.token.clone())?;
        if let Some(base_url) = &knowledge.github.base_url {
            client = client.with_base_url(base_url);
        }
        sources.push(Arc::new(GithubIssuesSource::new(client)));
    }

    info!(count = sources.len(), "Knowledge sources configured");
    Ok(sources)
}
