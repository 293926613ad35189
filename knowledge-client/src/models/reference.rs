use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    StackOverflow,
    Github,
}

impl ReferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StackOverflow => "stackoverflow",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A public discussion returned by an external search, in the source's own
/// relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub source: ReferenceSource,
    pub title: String,
    pub url: String,
    pub snippet: String,
}
