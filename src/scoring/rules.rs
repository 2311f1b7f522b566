use serde::{Deserialize, Serialize};

use crate::config::ScoringWeights;
use crate::evidence::{EvidencePayload, RiskLevel};

/// Rule groups, in the order their factors are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    NoData,
    Domain,
    Scam,
    Registry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskContribution {
    pub category: RuleCategory,
    pub points: u32,
    pub factor: String,
    /// Set for rules that count at most once per domain or organization.
    pub subject_key: Option<String>,
}

/// Where a domain's age falls relative to the configured bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    VeryNew,
    New,
    Established,
}

/// The rule table. Shared by the scorer and the `contributes_risk` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskRules {
    weights: ScoringWeights,
}

impl RiskRules {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn age_band(&self, age_days: i64) -> AgeBand {
        if age_days < self.weights.very_new_domain_days {
            AgeBand::VeryNew
        } else if age_days < self.weights.established_domain_days {
            AgeBand::New
        } else {
            AgeBand::Established
        }
    }

    pub fn no_data(&self) -> RiskContribution {
        RiskContribution {
            category: RuleCategory::NoData,
            points: self.weights.no_data,
            factor: "No identifiers extracted: unable to find any contact details or \
                     organization names to verify"
                .to_string(),
            subject_key: None,
        }
    }

    pub fn contribution(&self, payload: &EvidencePayload) -> Option<RiskContribution> {
        let w = &self.weights;
        match payload {
            EvidencePayload::DomainAge(report) => {
                let age = report.age_days?.max(0);
                let (points, factor) = match self.age_band(age) {
                    AgeBand::VeryNew => (
                        w.very_new_domain,
                        format!("Domain {} is very new ({} days old)", report.domain, age),
                    ),
                    AgeBand::New => (
                        w.new_domain,
                        format!("Domain {} is relatively new ({} days old)", report.domain, age),
                    ),
                    AgeBand::Established => return None,
                };
                Some(RiskContribution {
                    category: RuleCategory::Domain,
                    points,
                    factor,
                    subject_key: Some(report.domain.to_lowercase()),
                })
            }
            EvidencePayload::ScamMatch(report) => {
                let (points, factor) = if report.risk_level == RiskLevel::High {
                    (
                        w.scam_high,
                        format!("High risk match in scam database: {}", report.identifier),
                    )
                } else if report.risk_level == RiskLevel::Low || !report.matches.is_empty() {
                    (
                        w.scam_low,
                        format!("Suspicious patterns found: {}", report.identifier),
                    )
                } else {
                    return None;
                };
                Some(RiskContribution {
                    category: RuleCategory::Scam,
                    points,
                    factor,
                    subject_key: None,
                })
            }
            EvidencePayload::Registry(report) if !report.registered => Some(RiskContribution {
                category: RuleCategory::Registry,
                points: w.unregistered_org,
                factor: format!(
                    "Organization not found in official registry: {}",
                    report.organization
                ),
                subject_key: Some(report.organization.to_lowercase()),
            }),
            EvidencePayload::Registry(_)
            | EvidencePayload::RecentUpdates(_)
            | EvidencePayload::Inconclusive { .. } => None,
        }
    }
}

impl Default for RiskRules {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::IdentifierKind;
    use crate::evidence::{DomainAgeReport, RegistryReport, ScamMatch, ScamReport};

    fn domain(age: Option<i64>) -> EvidencePayload {
        EvidencePayload::DomainAge(DomainAgeReport {
            domain: "give-now.org".into(),
            registered: age.is_some(),
            age_days: age,
            registrar: None,
            created_at: None,
        })
    }

    fn scam(level: RiskLevel, matches: usize) -> EvidencePayload {
        EvidencePayload::ScamMatch(ScamReport {
            identifier: "+15550100".into(),
            kind: IdentifierKind::Phone,
            risk_level: level,
            matches: (0..matches)
                .map(|i| ScamMatch {
                    pattern: format!("p{}", i),
                    reason: "reported".into(),
                    source_url: None,
                })
                .collect(),
            search_results: vec![],
        })
    }

    #[test]
    fn test_domain_age_bands() {
        let rules = RiskRules::default();
        assert_eq!(rules.contribution(&domain(Some(0))).unwrap().points, 30);
        assert_eq!(rules.contribution(&domain(Some(29))).unwrap().points, 30);
        assert_eq!(rules.contribution(&domain(Some(30))).unwrap().points, 15);
        assert_eq!(rules.contribution(&domain(Some(364))).unwrap().points, 15);
        assert!(rules.contribution(&domain(Some(365))).is_none());
        assert!(rules.contribution(&domain(None)).is_none());
    }

    #[test]
    fn test_scam_levels() {
        let rules = RiskRules::default();
        assert_eq!(rules.contribution(&scam(RiskLevel::High, 1)).unwrap().points, 40);
        assert_eq!(rules.contribution(&scam(RiskLevel::Low, 0)).unwrap().points, 20);
        assert_eq!(rules.contribution(&scam(RiskLevel::None, 2)).unwrap().points, 20);
        assert!(rules.contribution(&scam(RiskLevel::None, 0)).is_none());
    }

    #[test]
    fn test_registry_only_unregistered_counts() {
        let rules = RiskRules::default();
        let report = |registered| {
            EvidencePayload::Registry(RegistryReport {
                organization: "Hope Foundation".into(),
                registered,
                details: None,
                verification_status: Default::default(),
                search_results: vec![],
            })
        };
        let hit = rules.contribution(&report(false)).unwrap();
        assert_eq!(hit.points, 25);
        assert!(hit.factor.contains("Hope Foundation"));
        assert!(rules.contribution(&report(true)).is_none());
    }

    #[test]
    fn test_custom_weights() {
        let rules = RiskRules::new(ScoringWeights {
            very_new_domain: 45,
            ..Default::default()
        });
        assert_eq!(rules.contribution(&domain(Some(1))).unwrap().points, 45);
    }
}
