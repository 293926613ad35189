//! Rule-based checks that resolve an issue before any lookup or model call.

use crate::domain::models::{Category, Decision, Issue, IssueState, KnownIssue, TriageVerdict};

use super::{fingerprint::normalize, rule_verdict};

const SPAM_MIN_URLS: usize = 3;
const SPAM_MIN_ALPHA_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum PreFilterOutcome {
    /// The issue is resolved by the named rule.
    Terminal {
        rule: &'static str,
        verdict: TriageVerdict,
    },
    Continue,
}

/// Runs the empty-report, exact-duplicate and link-spam rules, in that order.
///
/// `exact_matches` are other issues whose normalized text equals this one's.
pub fn prefilter(issue: &Issue, exact_matches: &[KnownIssue]) -> PreFilterOutcome {
    let title = normalize(&issue.title);
    let body = normalize(&issue.body);

    if title.is_empty() && body.is_empty() {
        return PreFilterOutcome::Terminal {
            rule: "empty_report",
            verdict: rule_verdict(
                Category::LowPriority,
                Decision::NeedsInfo,
                0.9,
                5,
                true,
                None,
                vec![],
                "The issue has neither a title nor a description.".to_string(),
            ),
        };
    }

    if let Some(original) = pick_original(exact_matches) {
        return PreFilterOutcome::Terminal {
            rule: "exact_duplicate",
            verdict: rule_verdict(
                Category::LowPriority,
                Decision::CloseDuplicate,
                1.0,
                10,
                true,
                Some(original.number),
                vec![],
                format!(
                    "Title and description are identical to #{} ({}).",
                    original.number, original.state
                ),
            ),
        };
    }

    if is_link_spam(&issue.body) {
        return PreFilterOutcome::Terminal {
            rule: "link_spam",
            verdict: rule_verdict(
                Category::LowPriority,
                Decision::Invalid,
                0.9,
                0,
                false,
                None,
                vec![],
                "The description is mostly links with almost no text.".to_string(),
            ),
        };
    }

    PreFilterOutcome::Continue
}

/// Lowest-numbered closed match, else the lowest-numbered match.
fn pick_original(matches: &[KnownIssue]) -> Option<&KnownIssue> {
    matches
        .iter()
        .filter(|m| m.state == IssueState::Closed)
        .min_by_key(|m| m.number)
        .or_else(|| matches.iter().min_by_key(|m| m.number))
}

fn is_link_spam(body: &str) -> bool {
    let (urls, text): (Vec<&str>, Vec<&str>) = body
        .split_whitespace()
        .partition(|token| token.contains("http://") || token.contains("https://"));

    if urls.len() < SPAM_MIN_URLS {
        return false;
    }

    let alpha = text
        .iter()
        .flat_map(|token| token.chars())
        .filter(|c| c.is_alphabetic())
        .count();
    alpha < SPAM_MIN_ALPHA_CHARS
}
