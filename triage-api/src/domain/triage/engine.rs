//! Orchestrates one triage request from raw issue to terminal outcome.

use std::{collections::HashSet, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    models::{
        CallCost, Category, Decision, DocLink, EvidenceBundle, Issue, IssueKey, IssueRef,
        RelatedLink, Scored, StoredVerdict, TokenUsage, TriageOutcome, TriageVerdict, UsageEntry,
        VerdictSource,
    },
    ports::{
        inbound::TriageOptions,
        outbound::{
            CostLedger, IssueCatalog, ModelRequest, ResponseCache, SimilarityIndex, TriageModel,
            VerdictRepository,
        },
    },
    EvidenceError, TriageError,
};

use super::{
    budget::BudgetGuard,
    degraded_verdict,
    evidence_rules::{apply_evidence_rules, EvidenceRuleThresholds},
    fingerprint::{fingerprint, similarity_signature},
    gather::{into_bundle, similar_issues, supporting_lookups},
    knowledge_lookup::CachedKnowledgeLookup,
    parse::{parse_reply, ModelVerdict},
    prefilter::{prefilter, PreFilterOutcome},
    pricing::{calculate_cost, pricing_for},
    prompt::{build_prompt, STRICT_INSTRUCTION, SYSTEM_PROMPT},
    responses::suggest,
};

/// Thresholds, limits and time budgets for the pipeline.
#[derive(Debug, Clone)]
pub struct TriageEngineConfig {
    pub duplicate_threshold: f64,
    pub pr_threshold: f64,
    pub code_threshold: f64,
    pub doc_threshold: f64,
    pub similarity_limit: usize,
    pub doc_fetch_limit: usize,
    pub doc_limit: usize,
    pub evidence_rules: EvidenceRuleThresholds,
    pub response_ttl: time::Duration,
    pub body_char_budget: usize,
    pub max_tokens: u32,
    pub lookup_timeout: Duration,
    pub request_deadline: Duration,
    pub daily_ceiling_usd: Option<f64>,
}

impl Default for TriageEngineConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.85,
            pr_threshold: 0.75,
            code_threshold: 0.75,
            doc_threshold: 0.60,
            similarity_limit: 10,
            doc_fetch_limit: 20,
            doc_limit: 5,
            evidence_rules: EvidenceRuleThresholds::default(),
            response_ttl: time::Duration::days(7),
            body_char_budget: 2000,
            max_tokens: 1500,
            lookup_timeout: Duration::from_secs(5),
            request_deadline: Duration::from_secs(30),
            daily_ceiling_usd: None,
        }
    }
}

/// Outbound collaborators of the engine.
#[derive(Clone)]
pub struct TriagePorts {
    pub index: Arc<dyn SimilarityIndex>,
    pub model: Arc<dyn TriageModel>,
    pub knowledge: Arc<CachedKnowledgeLookup>,
    pub response_cache: Arc<dyn ResponseCache>,
    pub ledger: Arc<dyn CostLedger>,
    pub verdicts: Arc<dyn VerdictRepository>,
    pub catalog: Arc<dyn IssueCatalog>,
}

/// Decides a verdict for one issue, calling the paid model only when cheaper
/// paths (rules, cache, evidence) cannot.
///
/// # Example
///
/// ```ignore
/// let engine = TriageEngine::new(ports, TriageEngineConfig::default());
/// let outcome = engine.triage(&issue, TriageOptions::default()).await?;
/// println!("{} via {}", outcome.verdict.category, outcome.source);
/// ```
pub struct TriageEngine {
    ports: TriagePorts,
    budget: BudgetGuard,
    config: TriageEngineConfig,
}

impl TriageEngine {
    pub fn new(ports: TriagePorts, config: TriageEngineConfig) -> Self {
        let budget = BudgetGuard::new(ports.ledger.clone(), config.daily_ceiling_usd);
        Self {
            ports,
            budget,
            config,
        }
    }

    /// Always ends in a verdict or an explicit error. A request that outlives
    /// the deadline gets a degraded verdict.
    #[instrument(name = "triage", skip(self, issue), fields(issue = %issue.key))]
    pub async fn triage(
        &self,
        issue: &Issue,
        options: TriageOptions,
    ) -> Result<TriageOutcome, TriageError> {
        match tokio::time::timeout(self.config.request_deadline, self.run(issue, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    deadline_secs = self.config.request_deadline.as_secs(),
                    "Triage exceeded request deadline"
                );
                Ok(self.degraded(
                    issue,
                    None,
                    None,
                    format!(
                        "Triage did not finish within the {}s request deadline; manual review needed.",
                        self.config.request_deadline.as_secs()
                    ),
                ))
            }
        }
    }

    async fn run(
        &self,
        issue: &Issue,
        options: TriageOptions,
    ) -> Result<TriageOutcome, TriageError> {
        let key = &issue.key;

        // 1. Pre-filter
        let exact_matches = match self.ports.catalog.find_exact_text(issue).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(issue = %key, error = %e, "Exact-text lookup failed, continuing without it");
                Vec::new()
            }
        };
        if let PreFilterOutcome::Terminal { rule, verdict } = prefilter(issue, &exact_matches) {
            info!(issue = %key, rule, "Resolved by pre-filter");
            self.persist(key, &verdict, VerdictSource::Rule).await;
            return Ok(rule_outcome(key, verdict, rule));
        }

        // 2. Cache check, with the supporting lookups already in flight
        let now = OffsetDateTime::now_utc();
        let vector = self.query_vector(key).await;
        let supporting_lookup = supporting_lookups(
            self.ports.index.as_ref(),
            &self.ports.knowledge,
            issue,
            vector.as_deref(),
            &self.config,
            now,
        );
        tokio::pin!(supporting_lookup);
        let issue_lookup =
            similar_issues(self.ports.index.as_ref(), issue, vector.as_deref(), &self.config);
        tokio::pin!(issue_lookup);

        let mut supporting = None;
        let similar = loop {
            tokio::select! {
                similar = &mut issue_lookup => break similar,
                lookups = &mut supporting_lookup, if supporting.is_none() => {
                    supporting = Some(lookups);
                }
            }
        };

        let fingerprint = cache_fingerprint(issue, &similar);
        match (&fingerprint, options.force) {
            (Some(fingerprint), false) => {
                match self.ports.response_cache.lookup(fingerprint, now).await {
                    Ok(Some(cached)) => {
                        info!(issue = %key, hit_count = cached.hit_count, "Response cache hit");
                        if let Err(e) = self
                            .ports
                            .ledger
                            .record(&UsageEntry::cache_hit(now.date()))
                            .await
                        {
                            warn!(issue = %key, error = %e, "Failed to record cache hit");
                        }
                        return Ok(TriageOutcome {
                            key: key.clone(),
                            verdict: cached.verdict,
                            source: VerdictSource::Cached,
                            fingerprint: Some(fingerprint.clone()),
                            cost: None,
                            rule: None,
                        });
                    }
                    Ok(None) => debug!(issue = %key, "Response cache miss"),
                    Err(e) => warn!(issue = %key, error = %e, "Response cache lookup failed"),
                }
            }
            (None, _) => info!(issue = %key, "Duplicate signature unknown, response cache skipped"),
            (Some(_), true) => {}
        }

        // 3. Gather
        let supporting = match supporting {
            Some(lookups) => lookups,
            None => supporting_lookup.await,
        };
        let evidence = into_bundle(issue, similar, supporting, &self.config);
        debug!(
            issue = %key,
            similar_issues = evidence.similar_issues.len(),
            pull_requests = evidence.pull_requests.len(),
            code = evidence.code.len(),
            docs = evidence.docs.len(),
            knowledge = evidence.knowledge.len(),
            gaps = evidence.gaps.len(),
            "Evidence gathered"
        );

        // 4. Evidence rules
        if let Some(matched) = apply_evidence_rules(issue, &evidence, &self.config.evidence_rules)
        {
            info!(issue = %key, rule = matched.rule, "Resolved by evidence rule");
            self.persist(key, &matched.verdict, VerdictSource::Rule).await;
            return Ok(rule_outcome(key, matched.verdict, matched.rule));
        }

        // 5. Decide
        self.budget.check(now).await?;
        let (parsed, cost) = self.decide(issue, &evidence, now).await?;

        let Some(parsed) = parsed else {
            warn!(issue = %key, "Model reply could not be parsed after retry");
            return Ok(self.degraded(
                issue,
                fingerprint,
                Some(cost),
                "The model reply could not be parsed after a retry; manual review needed."
                    .to_string(),
            ));
        };

        // 6. Assemble
        let verdict = self.assemble(parsed, &evidence);

        // 7. Persist
        if let Some(fingerprint) = &fingerprint {
            if let Err(e) = self
                .ports
                .response_cache
                .store(fingerprint, &verdict, self.config.response_ttl, now)
                .await
            {
                warn!(issue = %key, error = %e, "Failed to cache verdict");
            }
        }
        self.persist(key, &verdict, VerdictSource::Fresh).await;

        info!(
            issue = %key,
            category = %verdict.category,
            decision = %verdict.decision,
            cost_usd = cost.cost_usd,
            "Triage completed"
        );

        Ok(TriageOutcome {
            key: key.clone(),
            verdict,
            source: VerdictSource::Fresh,
            fingerprint,
            cost: Some(cost),
            rule: None,
        })
    }

    async fn query_vector(&self, key: &IssueKey) -> Option<Vec<f32>> {
        let lookup = tokio::time::timeout(
            self.config.lookup_timeout,
            self.ports.index.query_vector(key),
        )
        .await;
        match lookup {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                warn!(issue = %key, error = %e, "Query vector lookup failed");
                None
            }
            Err(_) => {
                warn!(issue = %key, "Query vector lookup timed out");
                None
            }
        }
    }

    /// Calls the model, retrying once with a stricter instruction on an
    /// unparseable reply. Usage of every attempt lands in one ledger entry.
    async fn decide(
        &self,
        issue: &Issue,
        evidence: &EvidenceBundle,
        now: OffsetDateTime,
    ) -> Result<(Option<ModelVerdict>, CallCost), TriageError> {
        let prompt = build_prompt(issue, evidence, self.config.body_char_budget);
        let mut request = ModelRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: self.config.max_tokens,
        };

        let mut usage = TokenUsage::default();
        let mut calls = 0u32;
        let mut model_name = self.ports.model.model_name().to_string();
        let mut parsed = None;

        for attempt in 0..2 {
            if attempt > 0 {
                request.prompt.push_str(STRICT_INSTRUCTION);
            }

            let reply = match self.ports.model.complete(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    if calls > 0 {
                        self.record_usage(&issue.key, now, calls, usage, &model_name)
                            .await;
                    }
                    return Err(e.into());
                }
            };
            calls += 1;
            usage = usage + reply.usage;
            model_name = reply.model;

            match parse_reply(&reply.text) {
                Ok(verdict) => {
                    parsed = Some(verdict);
                    break;
                }
                Err(e) => warn!(issue = %issue.key, attempt, error = %e, "Unparseable model reply"),
            }
        }

        let cost = self
            .record_usage(&issue.key, now, calls, usage, &model_name)
            .await;
        Ok((parsed, cost))
    }

    async fn record_usage(
        &self,
        key: &IssueKey,
        now: OffsetDateTime,
        llm_calls: u32,
        usage: TokenUsage,
        model: &str,
    ) -> CallCost {
        let cost = CallCost {
            llm_calls,
            usage,
            cost_usd: calculate_cost(&usage, &pricing_for(model)),
        };
        if let Err(e) = self
            .ports
            .ledger
            .record(&UsageEntry::miss(now.date(), cost))
            .await
        {
            warn!(issue = %key, error = %e, "Failed to record model usage");
        }
        cost
    }

    fn assemble(&self, parsed: ModelVerdict, evidence: &EvidenceBundle) -> TriageVerdict {
        let known_issues: HashSet<i32> = evidence
            .similar_issues
            .iter()
            .map(|issue| issue.item.number)
            .collect();
        let duplicate_of =
            best_duplicate(&evidence.similar_issues, self.config.duplicate_threshold).or(parsed
                .duplicate_of
                .filter(|number| known_issues.contains(number)));

        let known_prs: HashSet<i32> = evidence
            .pull_requests
            .iter()
            .map(|pr| pr.item.number)
            .collect();
        let mut seen = HashSet::new();
        let related_prs: Vec<i32> = parsed
            .related_prs
            .into_iter()
            .filter(|n| known_prs.contains(n) && seen.insert(*n))
            .collect();

        let doc_links: Vec<DocLink> = evidence
            .docs
            .iter()
            .map(|doc| DocLink {
                file: doc.item.filename.clone(),
                line: Some(doc.item.start_line),
                similarity: doc.similarity,
            })
            .collect();

        let related_links = evidence
            .knowledge
            .iter()
            .map(|hit| RelatedLink {
                text: hit.title.clone(),
                url: hit.url.clone(),
                source: hit.source.clone(),
            })
            .collect();

        let decision = parsed
            .decision
            .unwrap_or_else(|| derive_decision(parsed.category, duplicate_of, &doc_links));
        let suggested_responses = suggest(parsed.category, duplicate_of, &related_prs, &doc_links);

        TriageVerdict {
            category: parsed.category,
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
            duplicate_of,
            related_prs,
            priority_score: parsed.priority_score,
            needs_response: parsed.needs_response,
            doc_links,
            suggested_responses,
            tags: parsed.tags,
            decision,
            related_links,
        }
        .clamped()
    }

    /// Saves the verdict as the issue's current one. Failures are logged only.
    async fn persist(&self, key: &IssueKey, verdict: &TriageVerdict, source: VerdictSource) {
        let stored = StoredVerdict {
            key: key.clone(),
            verdict: verdict.clone(),
            source,
            created_at: OffsetDateTime::now_utc(),
        };
        if let Err(e) = self.ports.verdicts.save(&stored).await {
            warn!(issue = %key, error = %e, "Failed to persist verdict");
        }
    }

    fn degraded(
        &self,
        issue: &Issue,
        fingerprint: Option<String>,
        cost: Option<CallCost>,
        reasoning: String,
    ) -> TriageOutcome {
        TriageOutcome {
            key: issue.key.clone(),
            verdict: degraded_verdict(reasoning),
            source: VerdictSource::Degraded,
            fingerprint,
            cost,
            rule: None,
        }
    }
}

/// Cache key for this run. `None` when the issue lookup failed transiently,
/// since the duplicate signature is then unknown. An issue without an
/// embedding has a stable empty signature.
fn cache_fingerprint(
    issue: &Issue,
    similar: &Result<Vec<Scored<IssueRef>>, EvidenceError>,
) -> Option<String> {
    match similar {
        Ok(hits) => Some(fingerprint(issue, &similarity_signature(hits))),
        Err(EvidenceError::MissingVector(_)) => Some(fingerprint(issue, "")),
        Err(_) => None,
    }
}

fn rule_outcome(key: &IssueKey, verdict: TriageVerdict, rule: &'static str) -> TriageOutcome {
    TriageOutcome {
        key: key.clone(),
        verdict,
        source: VerdictSource::Rule,
        fingerprint: None,
        cost: None,
        rule: Some(rule),
    }
}

/// Highest similarity at or above `threshold`; equal similarities go to the lowest number.
fn best_duplicate(candidates: &[Scored<IssueRef>], threshold: f64) -> Option<i32> {
    candidates
        .iter()
        .filter(|c| c.similarity >= threshold)
        .max_by(|a, b| {
            a.similarity
                .total_cmp(&b.similarity)
                .then(b.item.number.cmp(&a.item.number))
        })
        .map(|c| c.item.number)
}

fn derive_decision(category: Category, duplicate_of: Option<i32>, docs: &[DocLink]) -> Decision {
    if duplicate_of.is_some() {
        return Decision::CloseDuplicate;
    }
    match category {
        Category::Question if !docs.is_empty() => Decision::AnswerFromDocs,
        Category::FeatureRequest => Decision::ValidFeature,
        Category::LowPriority => Decision::NeedsInfo,
        Category::Critical | Category::Bug | Category::Question => Decision::NeedsInvestigation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::adapters::outbound::{
        memory::{
            InMemoryCostLedger, InMemoryIssueCatalog, InMemoryResponseCache, InMemorySearchCache,
            InMemoryVerdictRepository,
        },
        mock::{MockSimilarityIndex, MockTriageModel},
    };
    use crate::domain::{
        models::{fixtures, Collection, Entity, IssueState, PullRequestRef, SimilarityHit},
        triage::knowledge_lookup::KnowledgeLookupConfig,
        ModelError,
    };

    const CRASH_REPLY: &str = r#"{
        "primary_category": "critical",
        "confidence": 0.93,
        "reasoning": "Segfault on startup with a stack trace",
        "duplicate_of": null,
        "related_prs": [45, 99],
        "priority_score": 95,
        "needs_response": true,
        "tags": ["crash"]
    }"#;

    struct Harness {
        model: MockTriageModel,
        index: MockSimilarityIndex,
        cache: Arc<InMemoryResponseCache>,
        ledger: Arc<InMemoryCostLedger>,
        verdicts: Arc<InMemoryVerdictRepository>,
        catalog: Arc<InMemoryIssueCatalog>,
        config: TriageEngineConfig,
    }

    impl Harness {
        fn new(model: MockTriageModel) -> Self {
            Self {
                model,
                index: MockSimilarityIndex::new(),
                cache: Arc::new(InMemoryResponseCache::new()),
                ledger: Arc::new(InMemoryCostLedger::new()),
                verdicts: Arc::new(InMemoryVerdictRepository::new()),
                catalog: Arc::new(InMemoryIssueCatalog::new()),
                config: TriageEngineConfig {
                    lookup_timeout: Duration::from_millis(100),
                    ..Default::default()
                },
            }
        }

        fn engine(&self) -> TriageEngine {
            let knowledge = CachedKnowledgeLookup::new(
                vec![],
                Arc::new(InMemorySearchCache::new()),
                KnowledgeLookupConfig::default(),
            );
            TriageEngine::new(
                TriagePorts {
                    index: Arc::new(self.index.clone()),
                    model: Arc::new(self.model.clone()),
                    knowledge: Arc::new(knowledge),
                    response_cache: self.cache.clone(),
                    ledger: self.ledger.clone(),
                    verdicts: self.verdicts.clone(),
                    catalog: self.catalog.clone(),
                },
                self.config.clone(),
            )
        }

        async fn today(&self) -> crate::domain::models::CostRecord {
            self.ledger
                .day(OffsetDateTime::now_utc().date())
                .await
                .unwrap()
        }
    }

    fn crash_issue() -> Issue {
        fixtures::issue(
            101,
            "App crashes on startup",
            "Segmentation fault (core dumped) right after launch.\n\nthread 'main' panicked",
        )
    }

    fn issue_hit(number: i32, similarity: f64) -> SimilarityHit {
        SimilarityHit {
            entity: Entity::Issue(IssueRef {
                number,
                title: format!("Issue {number}"),
                state: IssueState::Open,
            }),
            similarity,
        }
    }

    fn pr_hit(number: i32, similarity: f64) -> SimilarityHit {
        SimilarityHit {
            entity: Entity::PullRequest(PullRequestRef {
                number,
                title: format!("PR {number}"),
                state: "open".to_string(),
            }),
            similarity,
        }
    }

    #[tokio::test]
    async fn crash_report_is_critical_and_cached() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.1, 0.2]);
        let engine = harness.engine();
        let issue = crash_issue();

        let outcome = engine.triage(&issue, TriageOptions::default()).await.unwrap();

        assert_eq!(outcome.source, VerdictSource::Fresh);
        assert!(!outcome.cached());
        assert!(matches!(
            outcome.verdict.category,
            Category::Critical | Category::Bug
        ));
        assert!(outcome.verdict.is_within_bounds());

        let fingerprint = outcome.fingerprint.clone().unwrap();
        let cached = harness
            .cache
            .lookup(&fingerprint, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(cached.unwrap().verdict, outcome.verdict);
        assert!(harness.verdicts.current(&issue.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_identical_call_is_cached_and_free() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        let engine = harness.engine();
        let issue = crash_issue();

        let first = engine.triage(&issue, TriageOptions::default()).await.unwrap();
        let spent = harness.today().await;

        let second = engine.triage(&issue, TriageOptions::default()).await.unwrap();
        let after = harness.today().await;

        assert!(second.cached());
        assert_eq!(second.verdict, first.verdict);
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 1);
        assert_eq!(after.input_tokens, spent.input_tokens);
        assert_eq!(after.output_tokens, spent.output_tokens);
        assert_eq!(after.cache_hits, 1);
        assert_eq!(after.cache_misses, 1);
    }

    #[tokio::test]
    async fn forced_reruns_are_idempotent() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        let engine = harness.engine();
        let issue = crash_issue();
        let force = TriageOptions { force: true };

        let first = engine.triage(&issue, force).await.unwrap();
        let second = engine.triage(&issue, force).await.unwrap();

        assert_eq!(first.verdict, second.verdict);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(second.source, VerdictSource::Fresh);
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exact_duplicate_skips_model_and_ledger() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        let mut original = crash_issue();
        original.key = IssueKey::new("acme-widget", 12);
        original.state = IssueState::Closed;
        harness.catalog.insert(original);
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.source, VerdictSource::Rule);
        assert_eq!(outcome.rule, Some("exact_duplicate"));
        assert_eq!(outcome.verdict.duplicate_of, Some(12));
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 0);
        let today = harness.today().await;
        assert_eq!(today.cache_hits + today.cache_misses, 0);
        assert!(harness.verdicts.current(&outcome.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn pr_lookup_timeout_leaves_related_prs_empty() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.3, 0.1]);
        harness
            .index
            .set_hits(Collection::PullRequests, vec![pr_hit(45, 0.9)]);
        harness
            .index
            .set_delay(Collection::PullRequests, Duration::from_millis(500));
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.source, VerdictSource::Fresh);
        assert!(outcome.verdict.related_prs.is_empty());
    }

    #[tokio::test]
    async fn related_prs_are_limited_to_pr_evidence() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.3, 0.1]);
        harness.index.set_hits(
            Collection::PullRequests,
            vec![pr_hit(45, 0.8), pr_hit(46, 0.76)],
        );
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.verdict.related_prs, vec![45]);
    }

    #[tokio::test]
    async fn malformed_then_valid_uses_retry() {
        let model = MockTriageModel::new().with_sequence(vec![
            Ok("Sure! Here is my analysis: it is a bug.".to_string()),
            Ok(CRASH_REPLY.to_string()),
        ]);
        let harness = Harness::new(model);
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.source, VerdictSource::Fresh);
        assert_eq!(outcome.verdict.category, Category::Critical);
        assert_eq!(outcome.cost.unwrap().llm_calls, 2);
        let prompts = harness.model.prompts();
        assert!(prompts[1].ends_with(STRICT_INSTRUCTION));

        let today = harness.today().await;
        assert_eq!(today.cache_misses, 1);
        assert_eq!(today.llm_calls, 2);
    }

    #[tokio::test]
    async fn malformed_twice_degrades_without_caching() {
        let harness = Harness::new(MockTriageModel::new().returning("not json at all"));
        let engine = harness.engine();
        let issue = crash_issue();

        let outcome = engine.triage(&issue, TriageOptions::default()).await.unwrap();

        assert_eq!(outcome.source, VerdictSource::Degraded);
        assert_eq!(outcome.verdict.category, Category::LowPriority);
        assert_eq!(outcome.verdict.decision, Decision::NeedsInvestigation);
        assert_eq!(outcome.verdict.confidence, 0.0);
        assert!(outcome.verdict.reasoning.contains("could not be parsed"));
        assert!(harness.verdicts.current(&issue.key).await.unwrap().is_none());

        engine.triage(&issue, TriageOptions::default()).await.unwrap();
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn model_outage_surfaces_upstream_error() {
        let model = MockTriageModel::new().with_sequence(vec![Err(ModelError::Unavailable {
            message: "overloaded".into(),
            retry_after: Some(Duration::from_secs(20)),
        })]);
        let harness = Harness::new(model);
        let engine = harness.engine();
        let issue = crash_issue();

        let err = engine
            .triage(&issue, TriageOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TriageError::UpstreamUnavailable { retry_after: Some(d), .. } if d == Duration::from_secs(20)
        ));
        assert!(harness.verdicts.current(&issue.key).await.unwrap().is_none());
        assert_eq!(harness.cache.len(), 0);
    }

    #[tokio::test]
    async fn budget_ceiling_blocks_model_call() {
        let mut harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.config.daily_ceiling_usd = Some(1.0);
        harness
            .ledger
            .record(&UsageEntry::miss(
                OffsetDateTime::now_utc().date(),
                CallCost {
                    llm_calls: 1,
                    cost_usd: 1.5,
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        let engine = harness.engine();

        let err = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TriageError::BudgetExceeded { .. }));
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deadline_yields_degraded_verdict() {
        let mut harness = Harness::new(
            MockTriageModel::new()
                .returning(CRASH_REPLY)
                .with_delay(Duration::from_millis(500)),
        );
        harness.config.request_deadline = Duration::from_millis(100);
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.source, VerdictSource::Degraded);
        assert!(outcome.verdict.reasoning.contains("deadline"));
    }

    #[tokio::test]
    async fn near_duplicate_evidence_skips_model() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.5]);
        harness
            .index
            .set_hits(Collection::Issues, vec![issue_hit(7, 0.97), issue_hit(9, 0.9)]);
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.rule, Some("near_duplicate"));
        assert_eq!(outcome.verdict.duplicate_of, Some(7));
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_vector_marks_every_similarity_gap() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness
            .index
            .set_hits(Collection::PullRequests, vec![pr_hit(45, 0.9)]);
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.source, VerdictSource::Fresh);
        assert!(outcome.verdict.related_prs.is_empty());
        assert_eq!(harness.index.search_count().load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn issue_and_pr_lookups_overlap() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.3, 0.1]);
        harness
            .index
            .set_hits(Collection::Issues, vec![issue_hit(7, 0.9)]);
        harness
            .index
            .set_hits(Collection::PullRequests, vec![pr_hit(45, 0.9)]);
        harness
            .index
            .set_delay(Collection::Issues, Duration::from_millis(90));
        harness
            .index
            .set_delay(Collection::PullRequests, Duration::from_millis(90));
        let engine = harness.engine();

        let started = std::time::Instant::now();
        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.verdict.duplicate_of, Some(7));
        assert_eq!(outcome.verdict.related_prs, vec![45]);
        assert!(elapsed < Duration::from_millis(170), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn cache_hit_skips_waiting_on_supporting_lookups() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.3, 0.1]);
        harness
            .index
            .set_delay(Collection::PullRequests, Duration::from_millis(80));
        let engine = harness.engine();
        let issue = crash_issue();

        let fresh = engine.triage(&issue, TriageOptions::default()).await.unwrap();
        let started = std::time::Instant::now();
        let cached = engine.triage(&issue, TriageOptions::default()).await.unwrap();

        assert_eq!(fresh.source, VerdictSource::Fresh);
        assert!(cached.cached());
        assert!(started.elapsed() < Duration::from_millis(60));
    }

    #[tokio::test]
    async fn similarity_outage_neither_reads_nor_writes_cache() {
        let harness = Harness::new(MockTriageModel::new().returning(CRASH_REPLY));
        harness.index.set_vector(101, vec![0.3, 0.1]);
        harness
            .index
            .set_hits(Collection::Issues, vec![issue_hit(7, 0.9)]);
        let engine = harness.engine();
        let issue = crash_issue();

        let first = engine.triage(&issue, TriageOptions::default()).await.unwrap();
        assert!(first.fingerprint.is_some());
        assert_eq!(harness.cache.len(), 1);

        harness.index.set_failing(Collection::Issues);
        let during_outage = engine.triage(&issue, TriageOptions::default()).await.unwrap();

        assert_eq!(during_outage.source, VerdictSource::Fresh);
        assert_eq!(during_outage.fingerprint, None);
        assert_eq!(during_outage.verdict.duplicate_of, None);
        assert_eq!(harness.cache.len(), 1);
        assert_eq!(harness.model.call_count().load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn model_duplicate_needs_issue_evidence() {
        let reply = r#"{"primary_category": "bug", "confidence": 0.8,
            "reasoning": "Looks like #999", "duplicate_of": 999, "related_prs": [],
            "priority_score": 50, "needs_response": true, "tags": []}"#;
        let harness = Harness::new(MockTriageModel::new().returning(reply));
        let engine = harness.engine();

        let outcome = engine
            .triage(&crash_issue(), TriageOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.verdict.duplicate_of, None);
        assert_ne!(outcome.verdict.decision, Decision::CloseDuplicate);
    }

    #[test]
    fn best_duplicate_breaks_ties_by_lowest_number() {
        let candidates = vec![
            Scored::new(
                IssueRef {
                    number: 30,
                    title: String::new(),
                    state: IssueState::Open,
                },
                0.9,
            ),
            Scored::new(
                IssueRef {
                    number: 8,
                    title: String::new(),
                    state: IssueState::Open,
                },
                0.9,
            ),
            Scored::new(
                IssueRef {
                    number: 2,
                    title: String::new(),
                    state: IssueState::Open,
                },
                0.84,
            ),
        ];
        assert_eq!(best_duplicate(&candidates, 0.85), Some(8));
        assert_eq!(best_duplicate(&candidates[2..], 0.85), None);
    }

    #[test]
    fn decision_derives_from_category_and_evidence() {
        assert_eq!(
            derive_decision(Category::Bug, Some(3), &[]),
            Decision::CloseDuplicate
        );
        assert_eq!(
            derive_decision(Category::FeatureRequest, None, &[]),
            Decision::ValidFeature
        );
        let docs = vec![DocLink {
            file: "README.md".into(),
            line: None,
            similarity: 0.7,
        }];
        assert_eq!(
            derive_decision(Category::Question, None, &docs),
            Decision::AnswerFromDocs
        );
    }
}
