use std::collections::BTreeMap;

use time::OffsetDateTime;

use super::{Category, ProjectId, TriageVerdict, VerdictSource};

/// An open issue with its current verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct TriagedIssue {
    pub number: i32,
    pub title: String,
    pub verdict: TriageVerdict,
    pub source: VerdictSource,
    pub triaged_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub project: ProjectId,
    /// Per category, ordered by priority then confidence, both descending.
    pub groups: BTreeMap<Category, Vec<TriagedIssue>>,
    pub needs_triage_count: usize,
    pub today_count: usize,
}
