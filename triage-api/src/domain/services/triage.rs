use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use itertools::{Either, Itertools};
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::domain::{
    models::{
        CostRecord, CostSummary, Dashboard, IssueKey, ProjectId, StoredVerdict, TriageOutcome,
        TriagedIssue,
    },
    ports::{
        inbound::{TriageOptions, TriageService},
        outbound::{CostLedger, IssueCatalog, VerdictRepository},
    },
    triage::TriageEngine,
    TriageError,
};

/// Implementation of the TriageService inbound port.
///
/// Resolves issues from the catalog, runs them through the decision engine,
/// and builds the read models from stored verdicts and the cost ledger.
pub struct TriageServiceImpl<C, V, L> {
    catalog: Arc<C>,
    verdicts: Arc<V>,
    ledger: Arc<L>,
    engine: Arc<TriageEngine>,
}

impl<C, V, L> TriageServiceImpl<C, V, L> {
    pub fn new(catalog: Arc<C>, verdicts: Arc<V>, ledger: Arc<L>, engine: Arc<TriageEngine>) -> Self {
        Self {
            catalog,
            verdicts,
            ledger,
            engine,
        }
    }
}

#[async_trait]
impl<C: IssueCatalog, V: VerdictRepository, L: CostLedger> TriageService
    for TriageServiceImpl<C, V, L>
{
    async fn analyze(
        &self,
        key: &IssueKey,
        options: TriageOptions,
    ) -> Result<TriageOutcome, TriageError> {
        let issue = self
            .catalog
            .get(key)
            .await?
            .ok_or_else(|| TriageError::IssueNotFound(key.clone()))?;

        let outcome = self.engine.triage(&issue, options).await?;
        info!(
            issue = %key,
            source = %outcome.source,
            category = %outcome.verdict.category,
            force = options.force,
            "Triage completed"
        );
        Ok(outcome)
    }

    async fn current_verdict(&self, key: &IssueKey) -> Result<StoredVerdict, TriageError> {
        self.verdicts
            .current(key)
            .await?
            .ok_or_else(|| TriageError::IssueNotFound(key.clone()))
    }

    async fn dashboard(&self, project: &ProjectId) -> Result<Dashboard, TriageError> {
        let open = self.catalog.open_issues(project).await?;
        let mut current: HashMap<i32, StoredVerdict> = self
            .verdicts
            .current_for_project(project)
            .await?
            .into_iter()
            .map(|stored| (stored.key.number, stored))
            .collect();

        let today = OffsetDateTime::now_utc().date();
        let today_count = current
            .values()
            .filter(|stored| stored.created_at.date() == today)
            .count();

        let (triaged, untriaged): (Vec<TriagedIssue>, Vec<i32>) =
            open.into_iter().partition_map(|issue| {
                match current.remove(&issue.key.number) {
                    Some(stored) => Either::Left(TriagedIssue {
                        number: issue.key.number,
                        title: issue.title,
                        verdict: stored.verdict,
                        source: stored.source,
                        triaged_at: stored.created_at,
                    }),
                    None => Either::Right(issue.key.number),
                }
            });

        let mut groups: BTreeMap<_, Vec<TriagedIssue>> = BTreeMap::new();
        for item in triaged.into_iter().sorted_by(dashboard_order) {
            groups.entry(item.verdict.category).or_default().push(item);
        }

        Ok(Dashboard {
            project: project.clone(),
            groups,
            needs_triage_count: untriaged.len(),
            today_count,
        })
    }

    async fn costs(&self, days: u32) -> Result<(CostSummary, Vec<CostRecord>), TriageError> {
        let to = OffsetDateTime::now_utc().date();
        let from = to - Duration::days(i64::from(days.max(1)) - 1);
        let records = self.ledger.range(from, to).await?;
        Ok((CostSummary::from_records(&records), records))
    }
}

/// Priority, then confidence, both descending; issue number breaks ties.
fn dashboard_order(a: &TriagedIssue, b: &TriagedIssue) -> Ordering {
    b.verdict
        .priority_score
        .cmp(&a.verdict.priority_score)
        .then_with(|| b.verdict.confidence.total_cmp(&a.verdict.confidence))
        .then_with(|| a.number.cmp(&b.number))
}
