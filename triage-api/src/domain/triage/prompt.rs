//! Prompt construction for the triage model.

use crate::domain::models::{EvidenceBundle, Issue};

/// Code and doc matches listed in the prompt.
pub const MAX_PROMPT_MATCHES: usize = 5;
/// Characters of each code or doc match shown.
pub const PREVIEW_CHARS: usize = 200;
/// External references listed in the prompt.
pub const MAX_PROMPT_REFERENCES: usize = 3;

/// Stable instructions. Sent as a cacheable system block so repeated calls reuse it.
pub const SYSTEM_PROMPT: &str = r#"You triage GitHub issues for open source maintainers.

Assign exactly ONE primary category:

1. critical: security vulnerabilities, crashes, segfaults, data loss or corruption, breaking changes, production blockers.
2. bug: something that should work but does not. Error messages, stack traces, unexpected behaviour, "fails", "broken".
3. feature_request: something that does not exist yet. "add", "support", "implement", "allow", "it would be nice if".
4. question: usage questions. "How do I", "Why does", "What is", ends with "?". May be answered by documentation.
5. low_priority: spam, unclear, very minor, or a duplicate with no additional information.

Bugs describe broken behaviour, features describe new behaviour. If an existing issue is more than 85% similar, set duplicate_of.
Only list related_prs that appear in the evidence. Reference specific evidence in your reasoning.

Return JSON only:
{
  "primary_category": "critical|bug|feature_request|question|low_priority",
  "confidence": 0.95,
  "reasoning": "Detailed explanation",
  "duplicate_of": null,
  "related_prs": [],
  "priority_score": 85,
  "needs_response": true,
  "tags": [],
  "decision": "CLOSE_DUPLICATE|CLOSE_FIXED|CLOSE_EXISTS|NEEDS_INVESTIGATION|VALID_FEATURE|NEEDS_INFO|ANSWER_FROM_DOCS|INVALID"
}

confidence is between 0.0 and 1.0. priority_score is an integer from 0 to 100, higher is more urgent.
Be decisive. Return ONLY valid JSON, no markdown."#;

/// Appended on the retry after an unparseable reply.
pub const STRICT_INSTRUCTION: &str = "\n\nYour previous reply could not be parsed. Respond with a single JSON object \
matching the schema exactly. No prose, no markdown fences, no comments.";

/// Cuts `text` to `max_chars` characters and notes how much was dropped.
pub fn truncate_body(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!(
        "{kept}\n\n[... truncated {} characters for cost optimization]",
        total - max_chars
    )
}

pub fn build_prompt(issue: &Issue, evidence: &EvidenceBundle, body_char_budget: usize) -> String {
    let body = if issue.body.trim().is_empty() {
        "No description provided".to_string()
    } else {
        truncate_body(&issue.body, body_char_budget)
    };
    let labels = if issue.labels.is_empty() {
        "None".to_string()
    } else {
        issue.labels.join(", ")
    };

    let mut prompt = format!(
        "You are triaging GitHub issue #{}: \"{}\"\n\nIssue Description:\n{}\n\nLabels: {}\n\n## Semantic Search Results\n",
        issue.key.number, issue.title, body, labels
    );

    prompt.push_str("\n**Similar Issues:**\n");
    push_lines(
        &mut prompt,
        evidence.similar_issues.iter().map(|hit| {
            format!(
                "  - Issue #{}: {}\n    State: {}\n    Similarity: {:.1}%",
                hit.item.number,
                hit.item.title,
                hit.item.state,
                hit.similarity * 100.0
            )
        }),
    );

    prompt.push_str("\n**Related Pull Requests:**\n");
    push_lines(
        &mut prompt,
        evidence.pull_requests.iter().map(|hit| {
            format!(
                "  - PR #{}: {}\n    State: {}\n    Similarity: {:.1}%",
                hit.item.number,
                hit.item.title,
                hit.item.state,
                hit.similarity * 100.0
            )
        }),
    );

    let matches: Vec<_> = evidence
        .code
        .iter()
        .map(|hit| ("Code", hit))
        .chain(evidence.docs.iter().map(|hit| ("Documentation", hit)))
        .take(MAX_PROMPT_MATCHES)
        .collect();
    prompt.push_str("\n**Related Code and Documentation:**\n");
    push_lines(
        &mut prompt,
        matches.iter().map(|(kind, hit)| {
            let language = hit.item.language.as_deref().unwrap_or("text");
            let preview: String = hit.item.content.chars().take(PREVIEW_CHARS).collect();
            format!(
                "  - [{}] {} (lines {}-{})\n    Similarity: {:.1}%\n    Preview:\n    ```{}\n    {}...\n    ```",
                kind,
                hit.item.filename,
                hit.item.start_line,
                hit.item.end_line,
                hit.similarity * 100.0,
                language,
                preview
            )
        }),
    );

    prompt.push_str("\n**External References:**\n");
    push_lines(
        &mut prompt,
        evidence
            .knowledge
            .iter()
            .take(MAX_PROMPT_REFERENCES)
            .map(|hit| format!("  - [{}] {}\n    {}\n    {}", hit.source, hit.title, hit.url, hit.snippet)),
    );

    prompt
}

fn push_lines(prompt: &mut String, lines: impl Iterator<Item = String>) {
    let mut any = false;
    for line in lines {
        prompt.push_str(&line);
        prompt.push('\n');
        any = true;
    }
    if !any {
        prompt.push_str("None found\n");
    }
}
