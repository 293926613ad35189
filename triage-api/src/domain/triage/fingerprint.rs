//! Content fingerprints for the response and search caches.

use sha2::{Digest, Sha256};

use crate::domain::models::{Issue, IssueRef, Scored};

/// Leading body characters that take part in the fingerprint.
pub const FINGERPRINT_BODY_CHARS: usize = 500;
/// Nearest duplicates listed in the fingerprint signature.
pub const SIGNATURE_HITS: usize = 3;

/// Lowercases, collapses whitespace runs into one space and trims.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top issue-similarity hits as `#<number>@<similarity>`, comma separated.
///
/// `similar` must already be sorted by similarity descending.
pub fn similarity_signature(similar: &[Scored<IssueRef>]) -> String {
    similar
        .iter()
        .take(SIGNATURE_HITS)
        .map(|hit| format!("#{}@{:.2}", hit.item.number, hit.similarity))
        .collect::<Vec<_>>()
        .join(",")
}

/// SHA-256 hex over the normalized title, the leading normalized body and the signature.
pub fn fingerprint(issue: &Issue, signature: &str) -> String {
    let body: String = normalize(&issue.body)
        .chars()
        .take(FINGERPRINT_BODY_CHARS)
        .collect();
    let material = format!("{}\n{}\n{}", normalize(&issue.title), body, signature);

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Search cache key for a query sent to one knowledge source.
pub fn search_cache_key(source: &str, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", source, normalize(query)).as_bytes());
    format!("{:x}", hasher.finalize())
}
