use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-category match counts, keyed by category name
pub type Counts = BTreeMap<String, u32>;

/// Per-category example phrases, keyed by category name
pub type Examples = BTreeMap<String, Vec<String>>;

// Scores are required when deserializing; only counts and examples may be absent.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotivationFramework {
    pub support_ratio: f64,
    pub mission_density: f64,
    pub feature_density: f64,
    pub identity_score: f64,
    pub community_score: f64,
    #[serde(default)]
    pub counts: Counts,
    #[serde(default)]
    pub examples: Examples,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralTriggers {
    pub scarcity_score: f64,
    pub social_proof_score: f64,
    pub loss_aversion_score: f64,
    pub reciprocity_score: f64,
    pub authority_score: f64,
    #[serde(default)]
    pub counts: Counts,
    #[serde(default)]
    pub examples: Examples,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitFormation {
    pub temporal_score: f64,
    pub frequency_score: f64,
    pub convenience_score: f64,
    pub platform_score: f64,
    #[serde(default)]
    pub counts: Counts,
    #[serde(default)]
    pub examples: Examples,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalAppeals {
    pub fear_score: f64,
    pub hope_score: f64,
    pub belonging_score: f64,
    pub status_score: f64,
    #[serde(default)]
    pub examples: Examples,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CulturalAdaptations {
    pub cultural_elements: Vec<String>,
    pub local_references: Vec<String>,
    pub communication_style: String,
    pub trust_building: Vec<String>,
}

impl Default for CulturalAdaptations {
    fn default() -> Self {
        Self {
            cultural_elements: Vec::new(),
            local_references: Vec::new(),
            communication_style: "neutral".to_string(),
            trust_building: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Heuristic,
    ClaudeAi,
}

/// Scored behavioral-economics reading of one subscription page.
///
/// Category scores live in `0.0..=1.0`; `sophistication_score` in `0.0..=10.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub publisher_name: String,
    pub detected_language: String,
    pub language_name: String,
    pub total_words: usize,
    pub motivation_framework: MotivationFramework,
    pub behavioral_triggers: BehavioralTriggers,
    pub habit_formation: HabitFormation,
    pub emotional_appeals: EmotionalAppeals,
    #[serde(default)]
    pub cultural_adaptations: CulturalAdaptations,
    pub sophistication_score: f64,
    pub primary_strategy: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    pub analysis_method: AnalysisMethod,
    #[serde(default)]
    pub model: Option<String>,
    pub analysis_timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// Check every score against its documented range.
    ///
    /// Returns the name of the first offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let m = &self.motivation_framework;
        let b = &self.behavioral_triggers;
        let h = &self.habit_formation;
        let e = &self.emotional_appeals;

        let unit_scores = [
            ("motivation_framework.support_ratio", m.support_ratio),
            ("motivation_framework.mission_density", m.mission_density),
            ("motivation_framework.feature_density", m.feature_density),
            ("motivation_framework.identity_score", m.identity_score),
            ("motivation_framework.community_score", m.community_score),
            ("behavioral_triggers.scarcity_score", b.scarcity_score),
            ("behavioral_triggers.social_proof_score", b.social_proof_score),
            ("behavioral_triggers.loss_aversion_score", b.loss_aversion_score),
            ("behavioral_triggers.reciprocity_score", b.reciprocity_score),
            ("behavioral_triggers.authority_score", b.authority_score),
            ("habit_formation.temporal_score", h.temporal_score),
            ("habit_formation.frequency_score", h.frequency_score),
            ("habit_formation.convenience_score", h.convenience_score),
            ("habit_formation.platform_score", h.platform_score),
            ("emotional_appeals.fear_score", e.fear_score),
            ("emotional_appeals.hope_score", e.hope_score),
            ("emotional_appeals.belonging_score", e.belonging_score),
            ("emotional_appeals.status_score", e.status_score),
        ];

        for (name, value) in unit_scores {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} out of range: {value}"));
            }
        }

        if !self.sophistication_score.is_finite()
            || !(0.0..=10.0).contains(&self.sophistication_score)
        {
            return Err(format!(
                "sophistication_score out of range: {}",
                self.sophistication_score
            ));
        }

        Ok(())
    }
}
