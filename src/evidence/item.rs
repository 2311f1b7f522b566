use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{Identifier, IdentifierKind};
use crate::error::ProviderError;
use crate::scoring::RiskRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    DomainAge,
    ScamMatch,
    Registry,
    RecentUpdate,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainAge => "domain-age",
            Self::ScamMatch => "scam-match",
            Self::Registry => "registry",
            Self::RecentUpdate => "recent-update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "domain-age" => Some(Self::DomainAge),
            "scam-match" => Some(Self::ScamMatch),
            "registry" => Some(Self::Registry),
            "recent-update" => Some(Self::RecentUpdate),
            _ => None,
        }
    }

    /// Provider kinds that apply to an identifier kind.
    pub fn applicable_to(kind: IdentifierKind) -> &'static [ProviderKind] {
        match kind {
            IdentifierKind::Domain | IdentifierKind::Url => {
                &[ProviderKind::DomainAge, ProviderKind::ScamMatch]
            }
            IdentifierKind::Phone | IdentifierKind::Email => &[ProviderKind::ScamMatch],
            IdentifierKind::Organization => &[ProviderKind::Registry, ProviderKind::RecentUpdate],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAgeReport {
    pub domain: String,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamMatch {
    pub pattern: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamReport {
    pub identifier: String,
    pub kind: IdentifierKind,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub matches: Vec<ScamMatch>,
    #[serde(default)]
    pub search_results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    LikelyLegitimate,
    Unverified,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDetails {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryReport {
    pub organization: String,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RegistryDetails>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub search_results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentUpdatesReport {
    pub organization: String,
    #[serde(default)]
    pub updates: Vec<UpdateEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EvidencePayload {
    DomainAge(DomainAgeReport),
    ScamMatch(ScamReport),
    Registry(RegistryReport),
    RecentUpdates(RecentUpdatesReport),
    Inconclusive { reason: String },
}

impl EvidencePayload {
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive { .. })
    }
}

/// One provider check against one subject. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub id: String,
    pub identifier: Identifier,
    pub provider_kind: ProviderKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EvidencePayload,
    pub contributes_risk: bool,
}

impl EvidenceItem {
    pub fn new(
        identifier: Identifier,
        provider_kind: ProviderKind,
        payload: EvidencePayload,
        rules: &RiskRules,
    ) -> Self {
        let contributes_risk = rules.contribution(&payload).is_some();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identifier,
            provider_kind,
            timestamp: Utc::now(),
            payload,
            contributes_risk,
        }
    }

    /// Build from a provider outcome, absorbing failures as inconclusive.
    pub fn from_outcome(
        identifier: Identifier,
        provider_kind: ProviderKind,
        outcome: std::result::Result<EvidencePayload, ProviderError>,
        rules: &RiskRules,
    ) -> Self {
        let payload = outcome.unwrap_or_else(|e| EvidencePayload::Inconclusive {
            reason: e.to_string(),
        });
        Self::new(identifier, provider_kind, payload, rules)
    }

    pub fn inconclusive(
        identifier: Identifier,
        provider_kind: ProviderKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identifier,
            provider_kind,
            timestamp: Utc::now(),
            payload: EvidencePayload::Inconclusive {
                reason: reason.into(),
            },
            contributes_risk: false,
        }
    }

    pub fn is_inconclusive(&self) -> bool {
        self.payload.is_inconclusive()
    }
}
