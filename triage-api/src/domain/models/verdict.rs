use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use super::IssueKey;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    Critical,
    Bug,
    FeatureRequest,
    Question,
    LowPriority,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Critical,
        Category::Bug,
        Category::FeatureRequest,
        Category::Question,
        Category::LowPriority,
    ];
}

/// The single recommended maintainer action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Decision {
    CloseDuplicate,
    CloseFixed,
    CloseExists,
    NeedsInvestigation,
    ValidFeature,
    NeedsInfo,
    AnswerFromDocs,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocLink {
    pub file: String,
    pub line: Option<i32>,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseKind {
    CloseDuplicate,
    ProvideDocs,
    LinkPrs,
    EscalateCritical,
    AcknowledgeBug,
    AcknowledgeFeature,
    AnswerQuestion,
    CloseLowPriority,
}

/// A drafted maintainer reply with the tracker actions it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub title: String,
    pub body: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedLink {
    pub text: String,
    pub url: String,
    pub source: String,
}

pub const MAX_PRIORITY: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageVerdict {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
    pub duplicate_of: Option<i32>,
    pub related_prs: Vec<i32>,
    pub priority_score: u8,
    pub needs_response: bool,
    pub doc_links: Vec<DocLink>,
    pub suggested_responses: Vec<SuggestedResponse>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub decision: Decision,
    #[serde(default)]
    pub related_links: Vec<RelatedLink>,
}

impl TriageVerdict {
    /// Forces confidence into `[0, 1]` and priority into `[0, 100]`.
    pub fn clamped(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self.priority_score = self.priority_score.min(MAX_PRIORITY);
        self
    }

    pub fn is_within_bounds(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence) && self.priority_score <= MAX_PRIORITY
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// How a triage request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerdictSource {
    /// Produced by the model for this request.
    Fresh,
    /// Served from the response cache.
    Cached,
    /// Resolved by a heuristic without calling the model.
    Rule,
    /// Safe fallback after a parse failure or deadline.
    Degraded,
}

/// Token counts for one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cache_read_tokens: self.cache_read_tokens + rhs.cache_read_tokens,
            cache_write_tokens: self.cache_write_tokens + rhs.cache_write_tokens,
        }
    }
}

/// What the model calls behind a verdict cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CallCost {
    pub llm_calls: u32,
    pub usage: TokenUsage,
    pub cost_usd: f64,
}

impl std::ops::Add for CallCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            llm_calls: self.llm_calls + rhs.llm_calls,
            usage: self.usage + rhs.usage,
            cost_usd: self.cost_usd + rhs.cost_usd,
        }
    }
}

/// Terminal result of a triage request.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageOutcome {
    pub key: IssueKey,
    pub verdict: TriageVerdict,
    pub source: VerdictSource,
    pub fingerprint: Option<String>,
    pub cost: Option<CallCost>,
    /// Name of the heuristic that resolved the issue, for `Rule` outcomes.
    pub rule: Option<&'static str>,
}

impl TriageOutcome {
    pub fn cached(&self) -> bool {
        self.source == VerdictSource::Cached
    }
}

/// A persisted verdict, current until superseded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVerdict {
    pub key: IssueKey,
    pub verdict: TriageVerdict,
    pub source: VerdictSource,
    pub created_at: OffsetDateTime,
}
