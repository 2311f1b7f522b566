//! HTTP-backed providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{DomainAgeLookup, ProviderResult, RegistryLookup, ScamLookup, WebSearch};
use crate::case::IdentifierKind;
use crate::error::ProviderError;
use crate::evidence::{
    DomainAgeReport, RegistryDetails, RegistryReport, RiskLevel, ScamMatch, ScamReport, SearchHit,
    VerificationStatus,
};

const MAX_SEARCH_RESULTS: usize = 10;

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Domain age from the registration event of an RDAP record.
pub struct RdapDomainAge {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEvent {
    event_action: String,
    event_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    vcard_array: Option<serde_json::Value>,
}

impl RdapEntity {
    /// The `fn` property of the entity's jCard.
    fn display_name(&self) -> Option<String> {
        let properties = self.vcard_array.as_ref()?.get(1)?.as_array()?;
        properties.iter().find_map(|prop| {
            let prop = prop.as_array()?;
            if prop.first()?.as_str()? == "fn" {
                prop.get(3)?.as_str().map(str::to_string)
            } else {
                None
            }
        })
    }
}

impl RdapDomainAge {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }
}

#[async_trait]
impl DomainAgeLookup for RdapDomainAge {
    async fn check_domain_age(&self, domain: &str) -> ProviderResult<DomainAgeReport> {
        let url = format!("{}/domain/{}", self.base_url, domain);
        debug!(domain, "RDAP lookup");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DomainAgeReport {
                domain: domain.to_string(),
                registered: false,
                age_days: None,
                registrar: None,
                created_at: None,
            });
        }
        let record: RdapDomain = response.error_for_status()?.json().await?;

        let created_at = record
            .events
            .iter()
            .find(|e| e.event_action.eq_ignore_ascii_case("registration"))
            .map(|e| e.event_date);
        let registrar = record
            .entities
            .iter()
            .find(|e| e.roles.iter().any(|r| r == "registrar"))
            .and_then(RdapEntity::display_name);

        Ok(DomainAgeReport {
            domain: domain.to_string(),
            registered: true,
            age_days: created_at.map(|at| (Utc::now() - at).num_days().max(0)),
            registrar,
            created_at,
        })
    }
}

/// Scam database exposing `GET {base}/check?{kind}={identifier}`.
pub struct ScamDatabaseClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScamDatabaseResponse {
    #[serde(default, alias = "riskLevel")]
    risk_level: Option<String>,
    #[serde(default)]
    matches: Vec<ScamMatch>,
}

impl ScamDatabaseClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }
}

pub(crate) fn parse_risk_level(raw: Option<&str>) -> RiskLevel {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("high") => RiskLevel::High,
        Some("medium") | Some("low") => RiskLevel::Low,
        _ => RiskLevel::None,
    }
}

#[async_trait]
impl ScamLookup for ScamDatabaseClient {
    async fn check_scam_match(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> ProviderResult<ScamReport> {
        let url = format!("{}/check", self.base_url);
        let response: ScamDatabaseResponse = self
            .client
            .get(&url)
            .query(&[(kind.as_str(), identifier)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ScamReport {
            identifier: identifier.to_string(),
            kind,
            risk_level: parse_risk_level(response.risk_level.as_deref()),
            matches: response.matches,
            search_results: Vec::new(),
        })
    }
}

/// Registry exposing `GET {base}/search?name=..&type=..`.
pub struct RegistryApiClient {
    client: Client,
    base_url: String,
    organization_type: String,
}

#[derive(Debug, Deserialize)]
struct RegistryApiResponse {
    registered: bool,
    #[serde(default, alias = "registration_details", alias = "registrationDetails")]
    details: Option<RegistryDetails>,
    #[serde(default, alias = "verificationStatus")]
    verification_status: Option<VerificationStatus>,
}

impl RegistryApiClient {
    pub fn new(client: Client, base_url: &str, organization_type: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            organization_type: organization_type.to_string(),
        }
    }
}

#[async_trait]
impl RegistryLookup for RegistryApiClient {
    async fn check_registry(
        &self,
        organization: &str,
        location_hint: Option<&str>,
    ) -> ProviderResult<RegistryReport> {
        let url = format!("{}/search", self.base_url);
        let mut query = vec![
            ("name", organization),
            ("type", self.organization_type.as_str()),
        ];
        if let Some(location) = location_hint {
            query.push(("location", location));
        }

        let response: RegistryApiResponse = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let verification_status = response.verification_status.unwrap_or(if response.registered {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Unverified
        });

        Ok(RegistryReport {
            organization: organization.to_string(),
            registered: response.registered,
            details: response.details,
            verification_status,
            search_results: Vec::new(),
        })
    }
}

/// Google Custom Search JSON API.
pub struct CustomSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl CustomSearchClient {
    pub fn new(client: Client, endpoint: &str, api_key: &str, engine_id: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for CustomSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchHit>> {
        let num = max_results.clamp(1, MAX_SEARCH_RESULTS).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unavailable(
                "search quota exhausted or key rejected".to_string(),
            ));
        }
        let body: SearchResponse = response.error_for_status()?.json().await?;

        Ok(body
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .take(max_results)
            .map(|item| SearchHit {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect())
    }
}
