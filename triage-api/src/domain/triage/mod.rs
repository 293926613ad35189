//! The triage decision pipeline.
//!
//! Pre-filter, response cache, evidence gathering, evidence rules, the model
//! call and verdict assembly. Everything here talks to the outside world
//! through the outbound ports only.

pub mod budget;
pub mod engine;
pub mod evidence_rules;
pub mod fingerprint;
pub mod gather;
pub mod knowledge_lookup;
pub mod parse;
pub mod prefilter;
pub mod pricing;
pub mod prompt;
pub mod responses;
pub mod sweeper;

pub use budget::BudgetGuard;
pub use engine::{TriageEngine, TriageEngineConfig, TriagePorts};
pub use evidence_rules::EvidenceRuleThresholds;
pub use knowledge_lookup::{CachedKnowledgeLookup, KnowledgeLookupConfig};
pub use sweeper::run_cache_sweeper;

use crate::domain::models::{Category, Decision, DocLink, TriageVerdict};

#[allow(clippy::too_many_arguments)]
pub(crate) fn rule_verdict(
    category: Category,
    decision: Decision,
    confidence: f64,
    priority_score: u8,
    needs_response: bool,
    duplicate_of: Option<i32>,
    doc_links: Vec<DocLink>,
    reasoning: String,
) -> TriageVerdict {
    let suggested_responses = responses::suggest(category, duplicate_of, &[], &doc_links);
    TriageVerdict {
        category,
        confidence,
        reasoning,
        duplicate_of,
        related_prs: vec![],
        priority_score,
        needs_response,
        doc_links,
        suggested_responses,
        tags: vec![],
        decision,
        related_links: vec![],
    }
    .clamped()
}

/// Safe fallback when no trustworthy verdict could be produced.
pub(crate) fn degraded_verdict(reasoning: impl Into<String>) -> TriageVerdict {
    TriageVerdict {
        category: Category::LowPriority,
        confidence: 0.0,
        reasoning: reasoning.into(),
        duplicate_of: None,
        related_prs: vec![],
        priority_score: 0,
        needs_response: true,
        doc_links: vec![],
        suggested_responses: vec![],
        tags: vec!["needs-manual-triage".to_string()],
        decision: Decision::NeedsInvestigation,
        related_links: vec![],
    }
}
