//! Drafted maintainer replies attached to every verdict.

use crate::domain::models::{Category, DocLink, ResponseKind, SuggestedResponse};

pub const MAX_SUGGESTIONS: usize = 3;
const MAX_LISTED: usize = 3;

/// Evidence-specific drafts first, then the one matching the category. At most three.
pub fn suggest(
    category: Category,
    duplicate_of: Option<i32>,
    related_prs: &[i32],
    doc_links: &[DocLink],
) -> Vec<SuggestedResponse> {
    let mut responses = Vec::new();

    if let Some(number) = duplicate_of {
        responses.push(response(
            ResponseKind::CloseDuplicate,
            format!("Close as duplicate of #{number}"),
            format!(
                "Thanks for reporting! This appears to be a duplicate of #{number}. \
                 Please follow that issue for updates."
            ),
            &["comment", "close", "add_label:duplicate"],
        ));
    }

    if !doc_links.is_empty() {
        let docs = doc_links
            .iter()
            .take(MAX_LISTED)
            .map(|doc| format!("- [{0}]({0})", doc.file))
            .collect::<Vec<_>>()
            .join("\n");
        responses.push(response(
            ResponseKind::ProvideDocs,
            "Provide documentation links".to_string(),
            format!(
                "Thanks for your interest! You might find these resources helpful:\n\n{docs}\n\n\
                 Let us know if you have any questions!"
            ),
            &["comment"],
        ));
    }

    if !related_prs.is_empty() {
        let prs = related_prs
            .iter()
            .take(MAX_LISTED)
            .map(|n| format!("#{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        responses.push(response(
            ResponseKind::LinkPrs,
            "Link related PRs".to_string(),
            format!("This may be related to {prs}. Please check if those PRs address your issue."),
            &["comment"],
        ));
    }

    responses.push(match category {
        Category::Critical => response(
            ResponseKind::EscalateCritical,
            "Escalate as critical".to_string(),
            "Thanks for reporting this critical issue. We're escalating this to the team \
             for immediate attention."
                .to_string(),
            &["comment", "add_label:critical", "add_label:urgent"],
        ),
        Category::Bug => response(
            ResponseKind::AcknowledgeBug,
            "Acknowledge bug".to_string(),
            "Thanks for the bug report! We've confirmed this is a bug and will work on a fix. \
             We'll update this issue as we make progress."
                .to_string(),
            &["comment", "add_label:bug", "add_label:confirmed"],
        ),
        Category::FeatureRequest => response(
            ResponseKind::AcknowledgeFeature,
            "Acknowledge feature request".to_string(),
            "Thanks for the feature request! We'll consider this for a future release. \
             Feel free to contribute a PR if you'd like to help implement it!"
                .to_string(),
            &["comment", "add_label:enhancement"],
        ),
        Category::Question => response(
            ResponseKind::AnswerQuestion,
            "Answer question".to_string(),
            "Thanks for your question! [Add your answer here]\n\n\
             Let us know if this helps or if you need more clarification."
                .to_string(),
            &["comment", "add_label:question"],
        ),
        Category::LowPriority => response(
            ResponseKind::CloseLowPriority,
            "Close as low priority".to_string(),
            "Thanks for the report. This appears to be a very minor issue or lacks sufficient \
             detail. Please provide more information if this is a significant problem."
                .to_string(),
            &["comment", "close", "add_label:wontfix"],
        ),
    });

    responses.truncate(MAX_SUGGESTIONS);
    responses
}

fn response(kind: ResponseKind, title: String, body: String, actions: &[&str]) -> SuggestedResponse {
    SuggestedResponse {
        kind,
        title,
        body,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}
