//! Deterministic rule-based risk scoring.
//!
//! A `RiskAssessment` is a pure function of a case timeline and its no-data
//! flag. Rule weights come from `ScoringWeights`; verdict thresholds are fixed.

mod rules;

pub use rules::{AgeBand, RiskContribution, RiskRules, RuleCategory};

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ScoringWeights;
use crate::evidence::EvidenceItem;

pub const SUSPICIOUS_THRESHOLD: u32 = 40;
pub const SCAM_THRESHOLD: u32 = 70;
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Scam,
}

impl Verdict {
    pub fn from_score(score: u32) -> Self {
        if score >= SCAM_THRESHOLD {
            Self::Scam
        } else if score >= SUSPICIOUS_THRESHOLD {
            Self::Suspicious
        } else {
            Self::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Suspicious => "SUSPICIOUS",
            Self::Scam => "SCAM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SAFE" => Some(Self::Safe),
            "SUSPICIOUS" => Some(Self::Suspicious),
            "SCAM" => Some(Self::Scam),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: u32,
    pub verdict: Verdict,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RiskScorer {
    rules: RiskRules,
}

impl RiskScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            rules: RiskRules::new(weights),
        }
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    pub fn score(&self, timeline: &[EvidenceItem], no_data: bool) -> RiskAssessment {
        let mut contributions = Vec::new();
        if no_data {
            contributions.push(self.rules.no_data());
        }

        // Domain and registry rules count once per subject.
        let mut counted = HashSet::new();
        for item in timeline {
            let Some(contribution) = self.rules.contribution(&item.payload) else {
                continue;
            };
            if let Some(key) = contribution.subject_key.clone()
                && !counted.insert((contribution.category, key))
            {
                continue;
            }
            contributions.push(contribution);
        }

        // Stable: timeline order is kept within each category.
        contributions.sort_by_key(|c| c.category);

        let raw = contributions
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.points));
        let score = raw.min(MAX_SCORE);

        RiskAssessment {
            score,
            verdict: Verdict::from_score(score),
            risk_factors: contributions.into_iter().map(|c| c.factor).collect(),
        }
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

/// Score with the default rule weights.
pub fn score(timeline: &[EvidenceItem], no_data: bool) -> RiskAssessment {
    RiskScorer::default().score(timeline, no_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_boundaries() {
        assert_eq!(Verdict::from_score(0), Verdict::Safe);
        assert_eq!(Verdict::from_score(39), Verdict::Safe);
        assert_eq!(Verdict::from_score(40), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(69), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(70), Verdict::Scam);
        assert_eq!(Verdict::from_score(100), Verdict::Scam);
    }

    #[test]
    fn test_verdict_total_order() {
        assert!(Verdict::Safe < Verdict::Suspicious);
        assert!(Verdict::Suspicious < Verdict::Scam);
    }

    #[test]
    fn test_verdict_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Verdict::Suspicious).unwrap(),
            "\"SUSPICIOUS\""
        );
        assert_eq!(Verdict::parse("SCAM"), Some(Verdict::Scam));
    }

    #[test]
    fn test_empty_timeline_is_safe() {
        let result = score(&[], false);
        assert_eq!(result.score, 0);
        assert_eq!(result.verdict, Verdict::Safe);
        assert!(result.risk_factors.is_empty());
    }

    #[test]
    fn test_no_data_is_suspicious() {
        let result = score(&[], true);
        assert_eq!(result.score, 50);
        assert_eq!(result.verdict, Verdict::Suspicious);
        assert!(result.risk_factors[0].contains("No identifiers extracted"));
    }
}
