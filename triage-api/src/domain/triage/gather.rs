//! Concurrent evidence gathering with per-lookup timeouts.

use std::time::Duration;

use time::OffsetDateTime;
use tracing::warn;

use crate::domain::{
    models::{
        CodeChunk, Collection, Entity, EvidenceBundle, EvidenceSource, Issue, IssueRef,
        KnowledgeHit, PullRequestRef, Scored, SimilarityHit,
    },
    ports::outbound::{SimilarityIndex, SimilarityQuery},
    EvidenceError,
};

use super::{engine::TriageEngineConfig, knowledge_lookup::CachedKnowledgeLookup};

/// Keeps items at or above `threshold`, highest similarity first.
pub fn keep_above<T>(mut items: Vec<Scored<T>>, threshold: f64) -> Vec<Scored<T>> {
    items.retain(|item| item.similarity >= threshold);
    items.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    items
}

/// Runs one similarity query under `timeout`.
pub async fn timed_search(
    index: &dyn SimilarityIndex,
    query: SimilarityQuery,
    timeout: Duration,
) -> Result<Vec<SimilarityHit>, EvidenceError> {
    tokio::time::timeout(timeout, index.search_similar(&query))
        .await
        .map_err(|_| EvidenceError::Timeout)?
}

fn query(
    issue: &Issue,
    vector: &[f32],
    collection: Collection,
    threshold: f64,
    limit: usize,
) -> SimilarityQuery {
    SimilarityQuery {
        project: issue.key.project.clone(),
        vector: vector.to_vec(),
        collection,
        threshold,
        limit,
        exclude_issue: (collection == Collection::Issues).then_some(issue.key.number),
    }
}

fn issue_refs(hits: Vec<SimilarityHit>) -> Vec<Scored<IssueRef>> {
    hits.into_iter()
        .filter_map(|hit| match hit.entity {
            Entity::Issue(issue) => Some(Scored::new(issue, hit.similarity)),
            _ => None,
        })
        .collect()
}

fn pull_request_refs(hits: Vec<SimilarityHit>) -> Vec<Scored<PullRequestRef>> {
    hits.into_iter()
        .filter_map(|hit| match hit.entity {
            Entity::PullRequest(pr) => Some(Scored::new(pr, hit.similarity)),
            _ => None,
        })
        .collect()
}

fn chunks(hits: Vec<SimilarityHit>) -> Vec<Scored<CodeChunk>> {
    hits.into_iter()
        .filter_map(|hit| match hit.entity {
            Entity::Chunk(chunk) => Some(Scored::new(chunk, hit.similarity)),
            _ => None,
        })
        .collect()
}

/// Issues similar to `issue`, filtered at the duplicate threshold.
///
/// The cache fingerprint depends on this result, so the engine awaits it first
/// while the supporting lookups keep running.
pub async fn similar_issues(
    index: &dyn SimilarityIndex,
    issue: &Issue,
    vector: Option<&[f32]>,
    config: &TriageEngineConfig,
) -> Result<Vec<Scored<IssueRef>>, EvidenceError> {
    let vector = vector.ok_or_else(|| EvidenceError::MissingVector(issue.key.clone()))?;
    let hits = timed_search(
        index,
        query(
            issue,
            vector,
            Collection::Issues,
            config.duplicate_threshold,
            config.similarity_limit,
        ),
        config.lookup_timeout,
    )
    .await?;
    Ok(keep_above(issue_refs(hits), config.duplicate_threshold))
}

/// Raw results of the PR, code, doc and knowledge lookups.
pub struct SupportingLookups {
    prs: Result<Vec<SimilarityHit>, EvidenceError>,
    code: Result<Vec<SimilarityHit>, EvidenceError>,
    docs: Result<Vec<SimilarityHit>, EvidenceError>,
    knowledge: Vec<KnowledgeHit>,
}

/// Runs the PR, code, doc and knowledge lookups concurrently, each under its
/// own timeout.
pub async fn supporting_lookups(
    index: &dyn SimilarityIndex,
    knowledge: &CachedKnowledgeLookup,
    issue: &Issue,
    vector: Option<&[f32]>,
    config: &TriageEngineConfig,
    now: OffsetDateTime,
) -> SupportingLookups {
    let lookup = |collection: Collection, threshold: f64, limit: usize| async move {
        match vector {
            Some(vector) => {
                timed_search(
                    index,
                    query(issue, vector, collection, threshold, limit),
                    config.lookup_timeout,
                )
                .await
            }
            None => Err(EvidenceError::MissingVector(issue.key.clone())),
        }
    };

    let knowledge_search = async {
        if !knowledge.has_sources() {
            return Vec::new();
        }
        // Sources enforce their own timeout; this bounds the cache round trips too.
        tokio::time::timeout(config.lookup_timeout, knowledge.search(&issue.title, now))
            .await
            .unwrap_or_else(|_| {
                warn!(issue = %issue.key, "Knowledge lookup timed out");
                Vec::new()
            })
    };

    let (prs, code, docs, knowledge) = tokio::join!(
        lookup(
            Collection::PullRequests,
            config.pr_threshold,
            config.similarity_limit
        ),
        lookup(
            Collection::Code,
            config.code_threshold,
            config.similarity_limit
        ),
        lookup(
            Collection::Docs,
            config.doc_threshold,
            config.doc_fetch_limit
        ),
        knowledge_search,
    );

    SupportingLookups {
        prs,
        code,
        docs,
        knowledge,
    }
}

/// Filters every lookup into one bundle. Each failure becomes an empty list
/// and an entry in `gaps`.
pub fn into_bundle(
    issue: &Issue,
    similar: Result<Vec<Scored<IssueRef>>, EvidenceError>,
    supporting: SupportingLookups,
    config: &TriageEngineConfig,
) -> EvidenceBundle {
    let mut bundle = EvidenceBundle {
        knowledge: supporting.knowledge,
        ..Default::default()
    };

    bundle.similar_issues = absorb(issue, EvidenceSource::SimilarIssues, similar, &mut bundle.gaps);
    bundle.pull_requests = keep_above(
        pull_request_refs(absorb(
            issue,
            EvidenceSource::PullRequests,
            supporting.prs,
            &mut bundle.gaps,
        )),
        config.pr_threshold,
    );
    bundle.code = keep_above(
        chunks(absorb(issue, EvidenceSource::Code, supporting.code, &mut bundle.gaps)),
        config.code_threshold,
    );
    let mut doc_chunks = keep_above(
        chunks(absorb(issue, EvidenceSource::Docs, supporting.docs, &mut bundle.gaps)),
        config.doc_threshold,
    );
    doc_chunks.retain(|doc| doc.item.is_documentation());
    doc_chunks.truncate(config.doc_limit);
    bundle.docs = doc_chunks;

    bundle
}

fn absorb<T>(
    issue: &Issue,
    source: EvidenceSource,
    result: Result<Vec<T>, EvidenceError>,
    gaps: &mut Vec<EvidenceSource>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(issue = %issue.key, source = %source, error = %e, "Evidence gap");
            gaps.push(source);
            Vec::new()
        }
    }
}
