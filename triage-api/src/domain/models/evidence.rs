use serde::{Deserialize, Serialize};
use strum::Display;

use super::IssueState;

/// Vector collections exposed by the similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Issues,
    PullRequests,
    Code,
    Docs,
}

/// Evidence lookups run while gathering. Used to report which ones came back empty-handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvidenceSource {
    SimilarIssues,
    PullRequests,
    Code,
    Docs,
    Knowledge,
}

impl From<Collection> for EvidenceSource {
    fn from(collection: Collection) -> Self {
        match collection {
            Collection::Issues => Self::SimilarIssues,
            Collection::PullRequests => Self::PullRequests,
            Collection::Code => Self::Code,
            Collection::Docs => Self::Docs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: i32,
    pub title: String,
    pub state: IssueState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: i32,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub filename: String,
    pub start_line: i32,
    pub end_line: i32,
    pub language: Option<String>,
    pub content: String,
}

impl CodeChunk {
    /// Whether the chunk comes from documentation rather than source code.
    pub fn is_documentation(&self) -> bool {
        const DOC_PATTERNS: [&str; 7] = [
            ".md",
            ".rst",
            "readme",
            "docs/",
            "documentation",
            "doc/",
            ".txt",
        ];
        let filename = self.filename.to_lowercase();
        DOC_PATTERNS.iter().any(|pattern| filename.contains(pattern))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Issue(IssueRef),
    PullRequest(PullRequestRef),
    Chunk(CodeChunk),
}

/// One nearest neighbour returned by the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub entity: Entity,
    pub similarity: f64,
}

/// An evidence item paired with its similarity to the issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    pub item: T,
    pub similarity: f64,
}

impl<T> Scored<T> {
    pub fn new(item: T, similarity: f64) -> Self {
        Self { item, similarity }
    }

    /// Similarity as a whole percentage, for prompts and messages.
    pub fn percent(&self) -> u32 {
        (self.similarity.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// A public discussion found by an external knowledge source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub source: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub relevance: f64,
}

/// Everything gathered about an issue before the model is consulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidenceBundle {
    pub similar_issues: Vec<Scored<IssueRef>>,
    pub pull_requests: Vec<Scored<PullRequestRef>>,
    pub code: Vec<Scored<CodeChunk>>,
    pub docs: Vec<Scored<CodeChunk>>,
    pub knowledge: Vec<KnowledgeHit>,
    pub gaps: Vec<EvidenceSource>,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.similar_issues.is_empty()
            && self.pull_requests.is_empty()
            && self.code.is_empty()
            && self.docs.is_empty()
            && self.knowledge.is_empty()
    }
}
