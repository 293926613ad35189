//! HTTP response types for the triage endpoints.
//!
//! These types serialize to the camelCase JSON the dashboard expects.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::models::{
    BatchHandle, BatchIssueError, BatchState, BatchStatus, Category, CostRecord, CostSummary,
    Dashboard, Decision, DocLink, RelatedLink, StoredVerdict, SuggestedResponse, TriageOutcome,
    TriageVerdict, TriagedIssue, VerdictSource,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictResponse {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
    pub duplicate_of: Option<i32>,
    pub related_prs: Vec<i32>,
    pub priority_score: u8,
    pub needs_response: bool,
    pub doc_links: Vec<DocLink>,
    pub suggested_responses: Vec<SuggestedResponse>,
    pub tags: Vec<String>,
    pub decision: Decision,
    pub related_links: Vec<RelatedLink>,
}

impl From<TriageVerdict> for VerdictResponse {
    fn from(verdict: TriageVerdict) -> Self {
        Self {
            category: verdict.category,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            duplicate_of: verdict.duplicate_of,
            related_prs: verdict.related_prs,
            priority_score: verdict.priority_score,
            needs_response: verdict.needs_response,
            doc_links: verdict.doc_links,
            suggested_responses: verdict.suggested_responses,
            tags: verdict.tags,
            decision: verdict.decision,
            related_links: verdict.related_links,
        }
    }
}

/// Token and dollar cost of the model calls behind one analysis.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub llm_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub project: String,
    pub issue_number: i32,
    pub verdict: VerdictResponse,
    pub source: VerdictSource,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageResponse>,
}

impl From<TriageOutcome> for AnalyzeResponse {
    fn from(outcome: TriageOutcome) -> Self {
        let cached = outcome.cached();
        Self {
            project: outcome.key.project.to_string(),
            issue_number: outcome.key.number,
            verdict: outcome.verdict.into(),
            source: outcome.source,
            cached,
            rule: outcome.rule,
            usage: outcome.cost.map(|cost| UsageResponse {
                llm_calls: cost.llm_calls,
                input_tokens: cost.usage.input_tokens,
                output_tokens: cost.usage.output_tokens,
                cache_read_tokens: cost.usage.cache_read_tokens,
                cache_write_tokens: cost.usage.cache_write_tokens,
                cost_usd: cost.cost_usd,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVerdictResponse {
    pub project: String,
    pub issue_number: i32,
    pub verdict: VerdictResponse,
    pub source: VerdictSource,
    #[serde(with = "time::serde::rfc3339")]
    pub triaged_at: OffsetDateTime,
}

impl From<StoredVerdict> for StoredVerdictResponse {
    fn from(stored: StoredVerdict) -> Self {
        Self {
            project: stored.key.project.to_string(),
            issue_number: stored.key.number,
            verdict: stored.verdict.into(),
            source: stored.source,
            triaged_at: stored.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartedResponse {
    pub job_id: u64,
    pub total: usize,
}

impl From<BatchHandle> for BatchStartedResponse {
    fn from(handle: BatchHandle) -> Self {
        Self {
            job_id: handle.job_id,
            total: handle.total,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    pub job_id: Option<u64>,
    pub status: BatchState,
    pub total: usize,
    pub processed: usize,
    pub in_flight: Vec<i32>,
    pub errors: Vec<BatchIssueError>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl From<BatchStatus> for BatchStatusResponse {
    fn from(status: BatchStatus) -> Self {
        Self {
            job_id: status.job_id,
            status: status.status,
            total: status.total,
            processed: status.processed,
            in_flight: status.in_flight,
            errors: status.errors,
            started_at: status.started_at,
            finished_at: status.finished_at,
            failure: status.failure,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardIssueResponse {
    pub number: i32,
    pub title: String,
    pub verdict: VerdictResponse,
    pub source: VerdictSource,
    #[serde(with = "time::serde::rfc3339")]
    pub triaged_at: OffsetDateTime,
}

impl From<TriagedIssue> for DashboardIssueResponse {
    fn from(issue: TriagedIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            verdict: issue.verdict.into(),
            source: issue.source,
            triaged_at: issue.triaged_at,
        }
    }
}

/// Every category is present, empty or not.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub project: String,
    pub groups: BTreeMap<Category, Vec<DashboardIssueResponse>>,
    pub needs_triage_count: usize,
    pub today_count: usize,
}

impl From<Dashboard> for DashboardResponse {
    fn from(mut dashboard: Dashboard) -> Self {
        let groups = Category::ALL
            .into_iter()
            .map(|category| {
                let issues = dashboard
                    .groups
                    .remove(&category)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect();
                (category, issues)
            })
            .collect();
        Self {
            project: dashboard.project.to_string(),
            groups,
            needs_triage_count: dashboard.needs_triage_count,
            today_count: dashboard.today_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDayResponse {
    pub date: String,
    pub llm_calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl From<CostRecord> for CostDayResponse {
    fn from(record: CostRecord) -> Self {
        Self {
            date: record.date.to_string(),
            llm_calls: record.llm_calls,
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            cost_usd: record.cost_usd,
            cache_hits: record.cache_hits,
            cache_misses: record.cache_misses,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostsResponse {
    pub days: u32,
    pub summary: CostSummary,
    pub daily: Vec<CostDayResponse>,
}
