//! Parsing and validation of the model's JSON reply.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::models::{clamp_confidence, Category, Decision, MAX_PRIORITY};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("reply is not valid JSON: {0}")]
    Json(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(alias = "category")]
    primary_category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    duplicate_of: Option<i32>,
    #[serde(default)]
    related_prs: Vec<i32>,
    #[serde(default)]
    priority_score: f64,
    #[serde(default = "default_true")]
    needs_response: bool,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    decision: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A validated model reply with values forced into range.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
    pub duplicate_of: Option<i32>,
    pub related_prs: Vec<i32>,
    pub priority_score: u8,
    pub needs_response: bool,
    pub tags: Vec<String>,
    /// Unknown decision strings are dropped rather than rejected.
    pub decision: Option<Decision>,
}

/// Removes a surrounding ```json or ``` fence.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match inner {
        Some(rest) => rest.split("```").next().unwrap_or(rest).trim(),
        None => trimmed,
    }
}

pub fn parse_reply(text: &str) -> Result<ModelVerdict, ParseError> {
    let raw: RawReply =
        serde_json::from_str(strip_fences(text)).map_err(|e| ParseError::Json(e.to_string()))?;

    let category = Category::from_str(raw.primary_category.trim())
        .map_err(|_| ParseError::UnknownCategory(raw.primary_category.clone()))?;

    Ok(ModelVerdict {
        category,
        confidence: clamp_confidence(raw.confidence),
        reasoning: raw.reasoning,
        duplicate_of: raw.duplicate_of,
        related_prs: raw.related_prs,
        priority_score: clamp_priority(raw.priority_score),
        needs_response: raw.needs_response,
        tags: raw.tags,
        decision: raw
            .decision
            .as_deref()
            .and_then(|d| Decision::from_str(d.trim()).ok()),
    })
}

fn clamp_priority(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(MAX_PRIORITY)) as u8
}
