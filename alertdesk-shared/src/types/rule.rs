//! Correlation rule configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a rule decides that two alerts belong to the same incident.
///
/// `TagBased` is accepted in rule documents but has no executing logic; rules in
/// that mode are skipped by the grouping engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationMode {
    #[default]
    TagBased,
    Similarity,
}

/// Field list and threshold for similarity-mode rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Logical field names (aliases or `additional_details` keys) concatenated for scoring.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Minimum Jaccard score in `[0, 1]`.
    #[serde(default)]
    pub threshold: f64,
}

/// Configuration describing when two alerts should be treated as one incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRule {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Candidates must have been first seen within this many trailing minutes.
    /// Rules with a non-positive window are misconfigured and skipped.
    pub group_window_minutes: i64,
    #[serde(default)]
    pub correlation_mode: CorrelationMode,
    /// Fields that must match exactly between source and candidate.
    #[serde(default)]
    pub scope_tags: Vec<String>,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

impl CorrelationRule {
    /// Convenience constructor for a similarity-mode rule.
    pub fn similarity(
        name: impl Into<String>,
        group_window_minutes: i64,
        scope_tags: Vec<String>,
        fields: Vec<String>,
        threshold: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            group_window_minutes,
            correlation_mode: CorrelationMode::Similarity,
            scope_tags,
            similarity: SimilarityConfig { fields, threshold },
        }
    }
}
