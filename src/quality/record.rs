//! Quality records produced by the reviewer capability.

use crate::error::OrchestrationError;
use crate::router::extract::extract_payload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issue category reserved for failures of the review machinery itself
pub const SYSTEM_CATEGORY: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "trivial" => Severity::Low,
            "high" | "major" => Severity::High,
            "critical" | "blocker" | "severe" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub category: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRecord {
    /// Overall score, 0-100
    pub score: u8,
    #[serde(default)]
    pub category_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
    #[serde(default)]
    pub summary: String,
    /// Refinement rounds the reviewed artifact went through
    #[serde(default)]
    pub revision_count: u32,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(alias = "overall_score", alias = "overall")]
    score: f64,
    #[serde(default, alias = "scores")]
    category_scores: BTreeMap<String, f64>,
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default, alias = "feedback")]
    summary: String,
}

#[derive(Deserialize)]
struct RawIssue {
    #[serde(default = "general_category")]
    category: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(alias = "issue", alias = "message")]
    description: String,
}

fn general_category() -> String {
    "general".to_string()
}

fn to_score(value: f64, what: &str) -> Result<u8, OrchestrationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(OrchestrationError::UnparsableQualityRecord(format!(
            "{} {} is outside 0-100",
            what, value
        )));
    }
    Ok(value.round() as u8)
}

impl QualityRecord {
    /// Parse a reviewer reply, tolerating prose and code fences around the JSON record.
    pub fn parse(reply: &str) -> Result<Self, OrchestrationError> {
        let payload = extract_payload(reply).ok_or_else(|| {
            OrchestrationError::UnparsableQualityRecord("no JSON object in reply".to_string())
        })?;
        let raw: RawRecord = serde_json::from_str(payload)
            .map_err(|e| OrchestrationError::UnparsableQualityRecord(e.to_string()))?;

        let score = to_score(raw.score, "score")?;
        let mut category_scores = BTreeMap::new();
        for (category, value) in raw.category_scores {
            let value = to_score(value, &category)?;
            category_scores.insert(category, value);
        }

        Ok(Self {
            score,
            category_scores,
            issues: raw
                .issues
                .into_iter()
                .map(|issue| QualityIssue {
                    category: issue.category,
                    severity: issue
                        .severity
                        .as_deref()
                        .map(Severity::parse)
                        .unwrap_or(Severity::Medium),
                    description: issue.description,
                })
                .collect(),
            summary: raw.summary,
            revision_count: 0,
        })
    }

    /// Record standing in for a review that could not happen
    pub fn system_failure(reason: impl Into<String>, revision_count: u32) -> Self {
        let reason = reason.into();
        Self {
            score: 0,
            category_scores: BTreeMap::new(),
            issues: vec![QualityIssue {
                category: SYSTEM_CATEGORY.to_string(),
                severity: Severity::Critical,
                description: reason.clone(),
            }],
            summary: reason,
            revision_count,
        }
    }

    /// Zero score flagged by a system-category issue.
    ///
    /// A plain zero without such an issue is treated as a real (very low) score.
    pub fn is_system_failure(&self) -> bool {
        self.score == 0
            && self
                .issues
                .iter()
                .any(|issue| issue.category.eq_ignore_ascii_case(SYSTEM_CATEGORY))
    }
}
