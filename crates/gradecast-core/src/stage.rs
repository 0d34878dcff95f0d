//! # Stage Classifier
//!
//! Decides which completeness stage (`early`, `mid`, `full`) a set of
//! present canonical features represents.
//!
//! Rules, in order:
//! 1. all `full` requirements present: `full`, whatever else is present
//! 2. otherwise the non-full stage with the most matched requirements,
//!    ties broken by the configured priority list
//! 3. a winner with fewer matches than the evidence threshold falls back to
//!    `full`

use crate::error::{PredictError, PredictResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// STAGE
// =============================================================================

/// A named level of input completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Early,
    Mid,
    Full,
}

impl Stage {
    /// Every stage in declaration order.
    pub const ALL: [Stage; 3] = [Stage::Early, Stage::Mid, Stage::Full];

    /// Wire name of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Mid => "mid",
            Self::Full => "full",
        }
    }

    /// Comma-separated list of all stage names, for error messages.
    #[must_use]
    pub fn expected_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PredictError::UnknownStage {
                stage: s.to_string(),
                expected: Self::expected_list(),
            })
    }
}

// =============================================================================
// STAGE DEFINITIONS
// =============================================================================

/// Required canonical features for each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinitions {
    /// Ordered requirements per stage.
    pub required: BTreeMap<Stage, Vec<String>>,
}

impl StageDefinitions {
    /// Requirements of one stage (empty if undefined).
    #[must_use]
    pub fn required(&self, stage: Stage) -> &[String] {
        self.required.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Count how many of a stage's requirements are present.
    #[must_use]
    pub fn match_count(&self, stage: Stage, present: &BTreeSet<String>) -> usize {
        self.required(stage)
            .iter()
            .filter(|f| present.contains(*f))
            .count()
    }

    /// Check whether every requirement of a stage is present.
    #[must_use]
    pub fn is_complete(&self, stage: Stage, present: &BTreeSet<String>) -> bool {
        let required = self.required(stage);
        !required.is_empty() && required.iter().all(|f| present.contains(f))
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Why a stage was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageReason {
    /// Caller named the stage.
    Explicit,
    /// Every `full` requirement was present.
    Complete,
    /// Highest match count among the smaller stages.
    BestMatch,
    /// Too little evidence for a smaller stage.
    SparseFallback,
}

/// Outcome of stage classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDecision {
    pub stage: Stage,
    pub reason: StageReason,
    /// Match count of each candidate stage that was scored.
    pub scores: BTreeMap<Stage, usize>,
}

/// Stage classifier over fixed stage definitions.
#[derive(Debug, Clone)]
pub struct StageClassifier {
    definitions: StageDefinitions,
    priority: Vec<Stage>,
    min_evidence: usize,
}

impl StageClassifier {
    /// Create a classifier.
    ///
    /// `priority` lists the non-full stages from most to least preferred on a
    /// tie; it is also the candidate list.
    #[must_use]
    pub fn new(definitions: StageDefinitions, priority: Vec<Stage>, min_evidence: usize) -> Self {
        Self {
            definitions,
            priority,
            min_evidence,
        }
    }

    /// The stage definitions in use.
    #[must_use]
    pub fn definitions(&self) -> &StageDefinitions {
        &self.definitions
    }

    /// Classify a set of present canonical feature names.
    #[must_use]
    pub fn classify(&self, present: &BTreeSet<String>) -> StageDecision {
        if self.definitions.is_complete(Stage::Full, present) {
            debug!("all full-stage features present");
            return StageDecision {
                stage: Stage::Full,
                reason: StageReason::Complete,
                scores: BTreeMap::new(),
            };
        }

        let scores: BTreeMap<Stage, usize> = self
            .priority
            .iter()
            .filter(|s| **s != Stage::Full)
            .map(|s| (*s, self.definitions.match_count(*s, present)))
            .collect();

        // Walk in priority order and only replace on a strictly higher count,
        // so the earlier stage keeps a tie.
        let mut best: Option<(Stage, usize)> = None;
        for stage in self.priority.iter().filter(|s| **s != Stage::Full) {
            let count = scores.get(stage).copied().unwrap_or(0);
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((*stage, count));
            }
        }

        let decision = match best {
            Some((stage, count)) if count >= self.min_evidence => StageDecision {
                stage,
                reason: StageReason::BestMatch,
                scores,
            },
            _ => StageDecision {
                stage: Stage::Full,
                reason: StageReason::SparseFallback,
                scores,
            },
        };
        debug!(stage = %decision.stage, reason = ?decision.reason, "stage classified");
        decision
    }

    /// Classify, or honour a caller-named stage after validating it.
    ///
    /// A complete input is `full` even when the caller names a smaller stage.
    pub fn resolve(&self, hint: Option<&str>, present: &BTreeSet<String>) -> PredictResult<StageDecision> {
        let Some(name) = hint else {
            return Ok(self.classify(present));
        };
        let stage: Stage = name.parse()?;
        if stage != Stage::Full && self.definitions.is_complete(Stage::Full, present) {
            debug!(hint = %stage, "complete input overrides stage hint");
            return Ok(StageDecision {
                stage: Stage::Full,
                reason: StageReason::Complete,
                scores: BTreeMap::new(),
            });
        }
        Ok(StageDecision {
            stage,
            reason: StageReason::Explicit,
            scores: BTreeMap::new(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn classifier() -> StageClassifier {
        let mut required = BTreeMap::new();
        required.insert(
            Stage::Early,
            vec!["quiz1", "quiz2", "gender", "motivation"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        required.insert(
            Stage::Mid,
            vec!["quiz1", "quiz2", "midterm", "assignment1", "attendance"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        required.insert(
            Stage::Full,
            vec!["quiz1", "quiz2", "midterm", "assignment1", "attendance", "gender", "motivation"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        StageClassifier::new(StageDefinitions { required }, vec![Stage::Mid, Stage::Early], 2)
    }

    #[test]
    fn complete_input_is_full() {
        let present = names(&[
            "quiz1", "quiz2", "midterm", "assignment1", "attendance", "gender", "motivation",
        ]);
        let decision = classifier().classify(&present);
        assert_eq!(decision.stage, Stage::Full);
        assert_eq!(decision.reason, StageReason::Complete);
    }

    #[test]
    fn best_match_wins() {
        let present = names(&["quiz1", "quiz2", "gender", "motivation"]);
        let decision = classifier().classify(&present);
        assert_eq!(decision.stage, Stage::Early);
        assert_eq!(decision.scores.get(&Stage::Early), Some(&4));
        assert_eq!(decision.scores.get(&Stage::Mid), Some(&2));
    }

    #[test]
    fn tie_goes_to_priority_order() {
        let present = names(&["quiz1", "quiz2"]);
        let decision = classifier().classify(&present);
        assert_eq!(decision.stage, Stage::Mid);
        assert_eq!(decision.reason, StageReason::BestMatch);
    }

    #[test]
    fn sparse_input_falls_back_to_full() {
        let present = names(&["quiz1", "favourite_colour"]);
        let decision = classifier().classify(&present);
        assert_eq!(decision.stage, Stage::Full);
        assert_eq!(decision.reason, StageReason::SparseFallback);
    }

    #[test]
    fn explicit_stage_is_validated() {
        let c = classifier();
        let present = names(&[]);
        let ok = c.resolve(Some("Early"), &present);
        assert_eq!(ok.map(|d| d.stage), Ok(Stage::Early));

        let err = c.resolve(Some("final"), &present);
        assert!(matches!(err, Err(PredictError::UnknownStage { .. })));
    }

    #[test]
    fn complete_input_beats_smaller_stage_hint() {
        let c = classifier();
        let present = names(&[
            "quiz1", "quiz2", "midterm", "assignment1", "attendance", "gender", "motivation",
        ]);

        for hint in ["early", "mid"] {
            let Ok(decision) = c.resolve(Some(hint), &present) else {
                unreachable!("hint is a known stage");
            };
            assert_eq!(decision.stage, Stage::Full);
            assert_eq!(decision.reason, StageReason::Complete);
        }

        let err = c.resolve(Some("final"), &present);
        assert!(matches!(err, Err(PredictError::UnknownStage { .. })));
    }
}
