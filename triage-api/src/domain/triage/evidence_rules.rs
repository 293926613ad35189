//! Heuristics over gathered evidence that settle obvious cases without the model.

use serde::Deserialize;

use crate::domain::models::{
    Category, Decision, DocLink, EvidenceBundle, Issue, RelatedLink, TriageVerdict,
};

use super::rule_verdict;

const FEATURE_INDICATORS: [&str; 10] = [
    "add",
    "support",
    "implement",
    "allow",
    "enable",
    "would be nice",
    "could we",
    "feature request",
    "enhancement",
    "suggestion",
];

/// Similarity cut-offs. Each rule fires only strictly above its value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EvidenceRuleThresholds {
    pub near_duplicate: f64,
    pub docs_answer: f64,
    pub code_exists: f64,
}

impl Default for EvidenceRuleThresholds {
    fn default() -> Self {
        Self {
            near_duplicate: 0.95,
            docs_answer: 0.80,
            code_exists: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceMatch {
    pub rule: &'static str,
    pub verdict: TriageVerdict,
}

/// Near duplicate, answered by docs, then feature already exists.
///
/// Evidence lists are expected sorted by similarity descending.
pub fn apply_evidence_rules(
    issue: &Issue,
    evidence: &EvidenceBundle,
    thresholds: &EvidenceRuleThresholds,
) -> Option<EvidenceMatch> {
    if let Some(best) = evidence.similar_issues.first() {
        if best.similarity > thresholds.near_duplicate {
            let number = best.item.number;
            let mut verdict = rule_verdict(
                Category::LowPriority,
                Decision::CloseDuplicate,
                best.similarity,
                10,
                true,
                Some(number),
                vec![],
                format!(
                    "{}% similar to #{} \"{}\" ({}).",
                    best.percent(),
                    number,
                    best.item.title,
                    best.item.state
                ),
            );
            verdict.related_links.push(RelatedLink {
                text: format!("Original issue #{number}"),
                url: format!("#/issues/{number}"),
                source: "internal".to_string(),
            });
            return Some(EvidenceMatch {
                rule: "near_duplicate",
                verdict,
            });
        }
    }

    if let Some(doc) = evidence.docs.first() {
        if doc.similarity > thresholds.docs_answer {
            let link = DocLink {
                file: doc.item.filename.clone(),
                line: Some(doc.item.start_line),
                similarity: doc.similarity,
            };
            let mut verdict = rule_verdict(
                Category::Question,
                Decision::AnswerFromDocs,
                doc.similarity,
                20,
                true,
                None,
                vec![link],
                format!(
                    "Already explained in {} ({}% relevance).",
                    doc.item.filename,
                    doc.percent()
                ),
            );
            verdict.related_links.push(RelatedLink {
                text: format!("Documentation: {}", doc.item.filename),
                url: format!("#/docs/{}", doc.item.filename),
                source: "docs".to_string(),
            });
            return Some(EvidenceMatch {
                rule: "found_in_docs",
                verdict,
            });
        }
    }

    if let Some(code) = evidence.code.first() {
        if code.similarity > thresholds.code_exists && reads_as_feature_request(issue) {
            let mut verdict = rule_verdict(
                Category::FeatureRequest,
                Decision::CloseExists,
                code.similarity,
                15,
                true,
                None,
                vec![],
                format!(
                    "Requested behaviour already exists in {} lines {}-{} ({}% match).",
                    code.item.filename,
                    code.item.start_line,
                    code.item.end_line,
                    code.percent()
                ),
            );
            verdict.related_links.push(RelatedLink {
                text: format!("Code: {}:{}", code.item.filename, code.item.start_line),
                url: format!("#/code/{}#L{}", code.item.filename, code.item.start_line),
                source: "internal".to_string(),
            });
            return Some(EvidenceMatch {
                rule: "exists_in_code",
                verdict,
            });
        }
    }

    None
}

pub fn reads_as_feature_request(issue: &Issue) -> bool {
    let title = issue.title.to_lowercase();
    let body = issue.body.to_lowercase();
    FEATURE_INDICATORS
        .iter()
        .any(|indicator| title.contains(indicator) || body.contains(indicator))
}
