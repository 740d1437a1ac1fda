//! Multimodal analysis report and its schema validation.
//!
//! Providers return a [`RawAnalysisReport`] whose category names and issue
//! timestamps are loosely typed. [`RawAnalysisReport::validate`] turns it into
//! an [`AnalysisReport`] or rejects it; a rejected report counts as an
//! analysis failure.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::timestamp::{format_clock, parse_timestamp};

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;

/// The four scoring categories of the presentation framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    SpeechMechanics,
    ContentQuality,
    VisualPresentation,
    OverallEffectiveness,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 4] = [
        ScoreCategory::SpeechMechanics,
        ScoreCategory::ContentQuality,
        ScoreCategory::VisualPresentation,
        ScoreCategory::OverallEffectiveness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::SpeechMechanics => "speech_mechanics",
            ScoreCategory::ContentQuality => "content_quality",
            ScoreCategory::VisualPresentation => "visual_presentation",
            ScoreCategory::OverallEffectiveness => "overall_effectiveness",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ScoreCategory::SpeechMechanics => "Speech Mechanics",
            ScoreCategory::ContentQuality => "Content Quality",
            ScoreCategory::VisualPresentation => "Visual Presentation",
            ScoreCategory::OverallEffectiveness => "Overall Effectiveness",
        }
    }

    /// Accepts `speech_mechanics`, `Speech Mechanics`, `speech-mechanics`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == normalized)
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A timestamped finding with a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisIssue {
    pub timestamp_seconds: f64,
    pub description: String,
    pub recommendation: String,
    /// What is said contradicts what is shown
    #[serde(default)]
    pub cross_modal_mismatch: bool,
}

/// Validated analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub overall_score: f64,
    pub category_scores: BTreeMap<ScoreCategory, f64>,
    pub issues: Vec<AnalysisIssue>,
}

impl AnalysisReport {
    pub fn mismatch_count(&self) -> usize {
        self.issues.iter().filter(|i| i.cross_modal_mismatch).count()
    }

    pub fn score(&self, category: ScoreCategory) -> Option<f64> {
        self.category_scores.get(&category).copied()
    }

    /// One-line summary used in completion events and logs.
    pub fn summary(&self) -> String {
        let first_issue = self
            .issues
            .first()
            .map(|i| format!("; first issue at {}", format_clock(i.timestamp_seconds)))
            .unwrap_or_default();
        format!(
            "Overall {:.1}/10 with {} issue(s), {} cross-modal mismatch(es){}",
            self.overall_score,
            self.issues.len(),
            self.mismatch_count(),
            first_issue
        )
    }
}

/// Issue position as reported by a provider: seconds or a clock string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IssueTimestamp {
    Seconds(f64),
    Clock(String),
}

impl IssueTimestamp {
    pub fn to_seconds(&self) -> Option<f64> {
        match self {
            IssueTimestamp::Seconds(s) if s.is_finite() && *s >= 0.0 => Some(*s),
            IssueTimestamp::Seconds(_) => None,
            IssueTimestamp::Clock(s) => parse_timestamp(s).ok(),
        }
    }
}

/// Issue as returned by a provider, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawIssue {
    #[serde(alias = "timestamp_seconds")]
    pub timestamp: IssueTimestamp,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub cross_modal_mismatch: bool,
}

/// Report as returned by a provider, before validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawAnalysisReport {
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

impl RawAnalysisReport {
    /// Check the report against the schema and normalize it.
    ///
    /// Requires every score in `0.0..=10.0`, exactly the four categories and
    /// issues with a parseable timestamp and non-empty text. Issues keep the
    /// provider's order.
    pub fn validate(self) -> Result<AnalysisReport, ReportError> {
        let overall_score = self.overall_score.ok_or(ReportError::MissingOverallScore)?;
        check_score("overall_score", overall_score)?;

        let mut category_scores = BTreeMap::new();
        for (label, score) in self.category_scores {
            let category =
                ScoreCategory::from_label(&label).ok_or_else(|| ReportError::UnknownCategory(label.clone()))?;
            check_score(category.as_str(), score)?;
            if category_scores.insert(category, score).is_some() {
                return Err(ReportError::DuplicateCategory(category));
            }
        }
        if let Some(missing) = ScoreCategory::ALL
            .into_iter()
            .find(|c| !category_scores.contains_key(c))
        {
            return Err(ReportError::MissingCategory(missing));
        }

        let issues = self
            .issues
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let timestamp_seconds = raw
                    .timestamp
                    .to_seconds()
                    .ok_or(ReportError::InvalidIssueTimestamp(index))?;
                if raw.description.trim().is_empty() {
                    return Err(ReportError::EmptyIssueField(index, "description"));
                }
                if raw.recommendation.trim().is_empty() {
                    return Err(ReportError::EmptyIssueField(index, "recommendation"));
                }
                Ok(AnalysisIssue {
                    timestamp_seconds,
                    description: raw.description.trim().to_string(),
                    recommendation: raw.recommendation.trim().to_string(),
                    cross_modal_mismatch: raw.cross_modal_mismatch,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AnalysisReport {
            overall_score,
            category_scores,
            issues,
        })
    }
}

fn check_score(field: &str, score: f64) -> Result<(), ReportError> {
    if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(ReportError::ScoreOutOfRange {
            field: field.to_string(),
            score,
        })
    }
}

/// Schema violation in a provider report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("Report is missing overall_score")]
    MissingOverallScore,

    #[error("Score for {field} out of range: {score}")]
    ScoreOutOfRange { field: String, score: f64 },

    #[error("Unknown score category: {0}")]
    UnknownCategory(String),

    #[error("Missing score category: {0}")]
    MissingCategory(ScoreCategory),

    #[error("Duplicate score category: {0}")]
    DuplicateCategory(ScoreCategory),

    #[error("Issue {0} has an invalid timestamp")]
    InvalidIssueTimestamp(usize),

    #[error("Issue {0} has an empty {1}")]
    EmptyIssueField(usize, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawAnalysisReport {
        serde_json::from_value(value).unwrap()
    }

    fn valid_json() -> serde_json::Value {
        json!({
            "overall_score": 7.5,
            "category_scores": {
                "Speech Mechanics": 8.0,
                "Content Quality": 7.0,
                "visual_presentation": 6.5,
                "overall-effectiveness": 7.5
            },
            "issues": [
                {
                    "timestamp": "0:10",
                    "description": "Says 'three points' while the slide lists four",
                    "recommendation": "Align the spoken count with the slide",
                    "cross_modal_mismatch": true
                },
                {
                    "timestamp": 3.5,
                    "description": "Filler words",
                    "recommendation": "Pause instead of saying 'um'"
                }
            ]
        })
    }

    #[test]
    fn test_validate_accepts_mixed_labels_and_timestamps() {
        let report = raw(valid_json()).validate().unwrap();
        assert_eq!(report.category_scores.len(), 4);
        assert_eq!(report.score(ScoreCategory::VisualPresentation), Some(6.5));
        assert_eq!(report.issues[0].timestamp_seconds, 10.0);
        assert_eq!(report.issues[1].timestamp_seconds, 3.5);
        assert!(!report.issues[1].cross_modal_mismatch);
        assert_eq!(report.mismatch_count(), 1);
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        let mut value = valid_json();
        value["overall_score"] = json!(11.0);
        assert!(matches!(
            raw(value).validate(),
            Err(ReportError::ScoreOutOfRange { .. })
        ));

        let mut value = valid_json();
        value["category_scores"]["Content Quality"] = json!(-1.0);
        assert!(matches!(
            raw(value).validate(),
            Err(ReportError::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_requires_exactly_four_categories() {
        let mut value = valid_json();
        value["category_scores"]
            .as_object_mut()
            .unwrap()
            .remove("Content Quality");
        assert_eq!(
            raw(value).validate(),
            Err(ReportError::MissingCategory(ScoreCategory::ContentQuality))
        );

        let mut value = valid_json();
        value["category_scores"]["Charisma"] = json!(5.0);
        assert!(matches!(raw(value).validate(), Err(ReportError::UnknownCategory(_))));

        let mut value = valid_json();
        value["category_scores"]["speech_mechanics"] = json!(5.0);
        assert_eq!(
            raw(value).validate(),
            Err(ReportError::DuplicateCategory(ScoreCategory::SpeechMechanics))
        );
    }

    #[test]
    fn test_validate_rejects_bad_issues() {
        let mut value = valid_json();
        value["issues"][1]["timestamp"] = json!("soon");
        assert_eq!(raw(value).validate(), Err(ReportError::InvalidIssueTimestamp(1)));

        let mut value = valid_json();
        value["issues"][0]["recommendation"] = json!("  ");
        assert_eq!(
            raw(value).validate(),
            Err(ReportError::EmptyIssueField(0, "recommendation"))
        );
    }

    #[test]
    fn test_missing_overall_score() {
        let mut value = valid_json();
        value.as_object_mut().unwrap().remove("overall_score");
        assert_eq!(raw(value).validate(), Err(ReportError::MissingOverallScore));
    }

    #[test]
    fn test_summary_mentions_first_issue() {
        let report = raw(valid_json()).validate().unwrap();
        let summary = report.summary();
        assert!(summary.starts_with("Overall 7.5/10 with 2 issue(s)"));
        assert!(summary.contains("first issue at 0:10"));
    }
}
