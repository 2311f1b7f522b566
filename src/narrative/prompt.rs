use crate::case::{Identifier, IdentifierKind};
use crate::evidence::{EvidenceItem, EvidencePayload, RiskLevel};
use crate::scoring::RiskAssessment;

const MAX_FINDINGS: usize = 3;
const MAX_ORGANIZATIONS: usize = 3;
const MAX_FACTORS: usize = 5;

/// Evidence digest fed to the language-generation tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub domain_checks: usize,
    pub scam_checks: usize,
    pub registry_checks: usize,
    pub domain: Vec<String>,
    pub scam: Vec<String>,
    pub registry: Vec<String>,
    pub organizations: Vec<String>,
}

impl Findings {
    pub fn collect(timeline: &[EvidenceItem], identifiers: &[Identifier]) -> Self {
        let mut findings = Self::default();

        for item in timeline {
            match &item.payload {
                EvidencePayload::DomainAge(report) => {
                    findings.domain_checks += 1;
                    if let Some(age) = report.age_days {
                        findings
                            .domain
                            .push(format!("Domain '{}' is {} days old", report.domain, age));
                    }
                }
                EvidencePayload::ScamMatch(report) => {
                    findings.scam_checks += 1;
                    let line = if report.risk_level == RiskLevel::High || !report.matches.is_empty()
                    {
                        format!(
                            "'{}' flagged with {} scam report(s)",
                            report.identifier,
                            report.matches.len()
                        )
                    } else {
                        format!("'{}' - no scam reports found", report.identifier)
                    };
                    findings.scam.push(line);
                }
                EvidencePayload::Registry(report) => {
                    findings.registry_checks += 1;
                    let line = if report.registered {
                        format!("'{}' verified in official registry", report.organization)
                    } else {
                        format!("'{}' not found in official registry", report.organization)
                    };
                    findings.registry.push(line);
                }
                EvidencePayload::RecentUpdates(_) | EvidencePayload::Inconclusive { .. } => {}
            }
        }

        findings.organizations = identifiers
            .iter()
            .filter(|id| id.kind == IdentifierKind::Organization)
            .map(|id| id.value.clone())
            .collect();

        findings
    }

    fn bullets(lines: &[String], limit: usize) -> String {
        lines
            .iter()
            .take(limit)
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Investigation digest shared by every generator prompt.
    pub fn digest(&self, assessment: &RiskAssessment) -> String {
        let organizations = if self.organizations.is_empty() {
            "None identified".to_string()
        } else {
            self.organizations
                .iter()
                .take(MAX_ORGANIZATIONS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        };
        let factors = if assessment.risk_factors.is_empty() {
            "- No specific risk factors identified".to_string()
        } else {
            Self::bullets(&assessment.risk_factors, MAX_FACTORS)
        };

        let specific = [
            Self::bullets(&self.domain, MAX_FINDINGS),
            Self::bullets(&self.scam, MAX_FINDINGS),
            Self::bullets(&self.registry, MAX_FINDINGS),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        format!(
            "INVESTIGATION DATA:\n\
             - Domain checks performed: {}\n\
             - Scam database checks: {}\n\
             - Registry verification checks: {}\n\n\
             SPECIFIC FINDINGS:\n{}\n\n\
             ORGANIZATIONS IDENTIFIED:\n{}\n\n\
             RISK FACTORS:\n{}\n\n\
             RISK SCORE: {}/100\n\
             FINAL VERDICT: {}",
            self.domain_checks,
            self.scam_checks,
            self.registry_checks,
            if specific.is_empty() { "- None" } else { specific.as_str() },
            organizations,
            factors,
            assessment.score,
            assessment.verdict,
        )
    }
}

pub(super) const SYSTEM_INSTRUCTIONS: &str = "You are a professional forensic analyst writing an \
executive summary for a disaster relief verification report. Write 2-3 short paragraphs in clear, \
simple language anyone can understand (150-250 words). Mention the organizations by name if any \
are provided, explain what was checked and what was found, and end with the verdict and what it \
means for the reader. No bullet points, headers, labels, or markdown formatting.";

pub(super) fn user_prompt(findings: &Findings, assessment: &RiskAssessment) -> String {
    format!(
        "Write the executive summary for this investigation:\n\n{}",
        findings.digest(assessment)
    )
}

/// Remove markdown emphasis and heading characters.
pub fn strip_markdown(text: &str) -> String {
    text.replace(['*', '#'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringWeights;
    use crate::evidence::{DomainAgeReport, ProviderKind, RegistryReport};
    use crate::scoring::{RiskRules, Verdict};

    #[test]
    fn test_strip_markdown() {
        assert_eq!(
            strip_markdown("## Summary\n**Be careful** with *this*  "),
            "Summary\nBe careful with this"
        );
    }

    #[test]
    fn test_findings_digest() {
        let rules = RiskRules::new(ScoringWeights::default());
        let timeline = vec![
            EvidenceItem::new(
                Identifier::domain("give.org"),
                ProviderKind::DomainAge,
                EvidencePayload::DomainAge(DomainAgeReport {
                    domain: "give.org".into(),
                    registered: true,
                    age_days: Some(12),
                    registrar: None,
                    created_at: None,
                }),
                &rules,
            ),
            EvidenceItem::new(
                Identifier::organization("Hope Trust"),
                ProviderKind::Registry,
                EvidencePayload::Registry(RegistryReport {
                    organization: "Hope Trust".into(),
                    registered: false,
                    details: None,
                    verification_status: Default::default(),
                    search_results: vec![],
                }),
                &rules,
            ),
        ];
        let identifiers = vec![
            Identifier::domain("give.org"),
            Identifier::organization("Hope Trust"),
        ];

        let findings = Findings::collect(&timeline, &identifiers);
        assert_eq!(findings.domain_checks, 1);
        assert_eq!(findings.registry_checks, 1);
        assert_eq!(findings.organizations, vec!["Hope Trust".to_string()]);

        let assessment = RiskAssessment {
            score: 55,
            verdict: Verdict::Suspicious,
            risk_factors: vec!["Domain give.org is very new (12 days old)".into()],
        };
        let digest = findings.digest(&assessment);
        assert!(digest.contains("Domain 'give.org' is 12 days old"));
        assert!(digest.contains("'Hope Trust' not found in official registry"));
        assert!(digest.contains("FINAL VERDICT: SUSPICIOUS"));
    }
}
