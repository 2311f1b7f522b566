//! Verdict surface returned to the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::case::{CaseId, Identifier};
use crate::evidence::{EvidenceItem, EvidencePayload, VerificationStatus};
use crate::narrative::{Narrative, NarrativeTier, recommendations_for};
use crate::scoring::{AgeBand, RiskAssessment, RiskRules, Verdict};
use crate::store::CaseRecord;

const SOURCE_TITLE_LEN: usize = 50;
const SEARCH_SOURCES_PER_CHECK: usize = 5;
const UPDATE_SOURCES_PER_CHECK: usize = 3;
const NO_EVIDENCE: &str = "No verification evidence collected.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub verification_status: String,
    pub is_flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub case_id: CaseId,
    pub verdict: Verdict,
    pub risk_score: u32,
    pub summary: String,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub entities: Vec<EntityReport>,
    pub sources: Vec<SourceLink>,
    pub narrative_tier: NarrativeTier,
    pub elapsed_ms: u64,
    pub evidence_count: usize,
}

impl VerificationReport {
    pub fn build(
        case_id: CaseId,
        identifiers: &[Identifier],
        timeline: &[EvidenceItem],
        assessment: &RiskAssessment,
        narrative: &Narrative,
        rules: &RiskRules,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            case_id,
            verdict: assessment.verdict,
            risk_score: assessment.score,
            summary: narrative.summary.clone(),
            risk_factors: assessment.risk_factors.clone(),
            recommendations: narrative.recommendations.clone(),
            entities: entity_reports(identifiers, timeline, rules),
            sources: collect_sources(timeline),
            narrative_tier: narrative.tier,
            elapsed_ms,
            evidence_count: timeline.len(),
        }
    }

    /// Rebuild from a completed record. `None` unless the record has a verdict.
    pub fn from_record(record: &CaseRecord, rules: &RiskRules) -> Option<Self> {
        let fields = record.verdict_fields()?;
        let assessment = RiskAssessment {
            score: fields.risk_score,
            verdict: fields.verdict,
            risk_factors: fields.risk_factors.clone(),
        };
        let narrative = Narrative {
            summary: fields.summary.clone(),
            recommendations: if fields.recommendations.is_empty() {
                recommendations_for(fields.verdict)
            } else {
                fields.recommendations.clone()
            },
            tier: fields.narrative_tier,
        };
        let elapsed_ms = (fields.completed_at - record.created_at)
            .num_milliseconds()
            .max(0) as u64;

        Some(Self::build(
            record.case_id.clone(),
            &record.identifiers,
            &record.evidence,
            &assessment,
            &narrative,
            rules,
            elapsed_ms,
        ))
    }
}

/// Domain sentences follow the same age bands the scorer uses.
pub fn entity_reports(
    identifiers: &[Identifier],
    timeline: &[EvidenceItem],
    rules: &RiskRules,
) -> Vec<EntityReport> {
    identifiers
        .iter()
        .map(|identifier| {
            let related: Vec<&EvidenceItem> = timeline
                .iter()
                .filter(|item| identifier.matches_subject(&item.identifier))
                .collect();

            let sentences: Vec<String> = related.iter().filter_map(|i| describe(i, rules)).collect();
            let verification_status = if sentences.is_empty() {
                NO_EVIDENCE.to_string()
            } else {
                sentences.join(" ")
            };

            EntityReport {
                kind: identifier.kind.entity_label().to_string(),
                value: identifier.value.clone(),
                verification_status,
                is_flagged: related.iter().any(|i| i.contributes_risk),
            }
        })
        .collect()
}

fn describe(item: &EvidenceItem, rules: &RiskRules) -> Option<String> {
    let sentence = match &item.payload {
        EvidencePayload::DomainAge(report) => match report.age_days.map(|age| age.max(0)) {
            Some(age) => match rules.age_band(age) {
                AgeBand::VeryNew => format!(
                    "Domain is very new ({} days old), which may indicate a recently created site.",
                    age
                ),
                AgeBand::New => format!("Domain is relatively new ({} days old).", age),
                AgeBand::Established => format!(
                    "Domain has been registered for {} days, indicating established presence.",
                    age
                ),
            },
            None if report.registered => "Domain registration details verified.".to_string(),
            None => "Domain does not appear to be registered.".to_string(),
        },
        EvidencePayload::ScamMatch(report) => {
            if item.contributes_risk {
                format!(
                    "Flagged in scam database with {} match(es).",
                    report.matches.len()
                )
            } else {
                "No scam reports found.".to_string()
            }
        }
        EvidencePayload::Registry(report) => {
            if report.registered {
                let source = report
                    .details
                    .as_ref()
                    .map(|d| d.source.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or("official registry");
                format!(
                    "Verified as registered in {}. Official registration confirmed.",
                    source
                )
            } else if report.verification_status == VerificationStatus::LikelyLegitimate {
                "Appears in verified sources and reputable platforms, indicating likely legitimacy."
                    .to_string()
            } else if !report.search_results.is_empty() {
                "Found in search results but not verified in official registry. Exercise caution."
                    .to_string()
            } else {
                "Not found in official registry or reputable platforms. Verification incomplete."
                    .to_string()
            }
        }
        EvidencePayload::RecentUpdates(report) => {
            if report.updates.is_empty() {
                return None;
            }
            format!(
                "Recent updates/news found ({} source(s)).",
                report.updates.len()
            )
        }
        EvidencePayload::Inconclusive { reason } => {
            format!("{} check inconclusive: {}.", item.provider_kind, reason)
        }
    };
    Some(sentence)
}

fn truncate_title(title: &str, fallback: &str) -> String {
    let title = if title.trim().is_empty() {
        fallback
    } else {
        title
    };
    title.chars().take(SOURCE_TITLE_LEN).collect()
}

pub fn collect_sources(timeline: &[EvidenceItem]) -> Vec<SourceLink> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    let mut push = |title: &str, fallback: &str, uri: &str| {
        if !uri.is_empty() && seen.insert(uri.to_string()) {
            sources.push(SourceLink {
                title: truncate_title(title, fallback),
                uri: uri.to_string(),
            });
        }
    };

    for item in timeline {
        match &item.payload {
            EvidencePayload::ScamMatch(report) => {
                for hit in report.search_results.iter().take(SEARCH_SOURCES_PER_CHECK) {
                    push(&hit.title, "Search Result", &hit.link);
                }
            }
            EvidencePayload::Registry(report) => {
                if let Some(details) = &report.details
                    && let Some(url) = &details.url
                {
                    push(&details.source, "Official Registry", url);
                }
                for hit in report.search_results.iter().take(SEARCH_SOURCES_PER_CHECK) {
                    push(&hit.title, "Search Result", &hit.link);
                }
            }
            EvidencePayload::RecentUpdates(report) => {
                for update in report.updates.iter().take(UPDATE_SOURCES_PER_CHECK) {
                    push(&update.title, "Recent Update", &update.url);
                }
            }
            EvidencePayload::DomainAge(_) | EvidencePayload::Inconclusive { .. } => {}
        }
    }
    sources
}
