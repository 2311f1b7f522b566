//! Search-backed heuristics layered over a `WebSearch` capability.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::{ProviderResult, RegistryLookup, ScamLookup, UpdatesLookup, WebSearch};
use crate::case::IdentifierKind;
use crate::config::ProviderConfig;
use crate::evidence::{
    RecentUpdatesReport, RegistryDetails, RegistryReport, RiskLevel, ScamMatch, ScamReport,
    SearchHit, UpdateEntry, VerificationStatus,
};

const MAX_REGISTRY_RESULTS: usize = 10;
const REPUTATION_WINDOW: usize = 5;
const REPUTABLE_KEYWORDS: &[&str] = &["verified", "official", "registered", "legitimate", "authentic"];

fn lowercase_all(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn quoted_with_location(name: &str, location_hint: Option<&str>) -> String {
    match location_hint {
        Some(location) if !location.trim().is_empty() => format!("\"{}\" {}", name, location),
        _ => format!("\"{}\"", name),
    }
}

fn hit_text(hit: &SearchHit) -> String {
    format!("{} {}", hit.title, hit.snippet).to_lowercase()
}

/// Scam screen combining an identifier keyword check, web search for scam
/// reports, and an optional scam database.
pub struct SearchScamScreen {
    keywords: Vec<String>,
    indicators: Vec<String>,
    max_results: usize,
    search: Option<Arc<dyn WebSearch>>,
    database: Option<Arc<dyn ScamLookup>>,
}

impl SearchScamScreen {
    pub fn new(
        config: &ProviderConfig,
        search: Option<Arc<dyn WebSearch>>,
        database: Option<Arc<dyn ScamLookup>>,
    ) -> Self {
        Self {
            keywords: lowercase_all(&config.scam_keywords),
            indicators: lowercase_all(&config.scam_indicators),
            max_results: config.search_max_results,
            search,
            database,
        }
    }

    fn keyword_matches(&self, identifier: &str) -> Vec<ScamMatch> {
        let lowered = identifier.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .map(|k| ScamMatch {
                pattern: k.clone(),
                reason: "Suspicious keyword detected".to_string(),
                source_url: None,
            })
            .collect()
    }

    /// One match per result that mentions an indicator.
    fn indicator_matches(&self, hits: &[SearchHit]) -> Vec<ScamMatch> {
        hits.iter()
            .filter_map(|hit| {
                let text = hit_text(hit);
                self.indicators
                    .iter()
                    .find(|i| text.contains(i.as_str()))
                    .map(|indicator| ScamMatch {
                        pattern: indicator.clone(),
                        reason: format!("Found in search results: {}", hit.title),
                        source_url: Some(hit.link.clone()),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl ScamLookup for SearchScamScreen {
    async fn check_scam_match(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> ProviderResult<ScamReport> {
        let mut matches = self.keyword_matches(identifier);
        let mut risk_level = if matches.is_empty() {
            RiskLevel::None
        } else {
            RiskLevel::High
        };
        let mut search_results = Vec::new();

        if let Some(search) = &self.search {
            let query = format!("\"{}\" scam OR fraud OR complaint", identifier);
            match search.search(&query, self.max_results).await {
                Ok(hits) => {
                    let found = self.indicator_matches(&hits);
                    // One report raises suspicion; a second makes it high risk.
                    for _ in &found {
                        risk_level = match risk_level {
                            RiskLevel::None => RiskLevel::Low,
                            _ => RiskLevel::High,
                        };
                    }
                    matches.extend(found);
                    search_results = hits;
                }
                Err(e) if !matches.is_empty() => {
                    warn!(identifier, error = %e, "Scam search failed, keeping keyword matches");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(database) = &self.database {
            match database.check_scam_match(identifier, kind).await {
                Ok(report) => {
                    risk_level = risk_level.max(report.risk_level);
                    matches.extend(report.matches);
                }
                Err(e) if !matches.is_empty() || !search_results.is_empty() => {
                    warn!(identifier, error = %e, "Scam database lookup failed");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            identifier,
            matches = matches.len(),
            risk = ?risk_level,
            "Scam screen complete"
        );

        Ok(ScamReport {
            identifier: identifier.to_string(),
            kind,
            risk_level,
            matches,
            search_results,
        })
    }
}

/// Registry check that looks for the organization on official registry sites.
pub struct SearchRegistry {
    search: Arc<dyn WebSearch>,
    organization_type: String,
    markers: Vec<String>,
    max_results: usize,
}

impl SearchRegistry {
    pub fn new(config: &ProviderConfig, search: Arc<dyn WebSearch>) -> Self {
        Self {
            search,
            organization_type: config.organization_type.clone(),
            markers: lowercase_all(&config.official_registry_markers),
            max_results: config.search_max_results,
        }
    }

    fn queries(&self, organization: &str, location_hint: Option<&str>) -> Vec<String> {
        let base = quoted_with_location(organization, location_hint);
        vec![
            format!(
                "{} {} registry OR registration OR official",
                base, self.organization_type
            ),
            format!("{} verified OR legitimate OR official", base),
            format!("{} official website OR contact", base),
        ]
    }
}

#[async_trait]
impl RegistryLookup for SearchRegistry {
    async fn check_registry(
        &self,
        organization: &str,
        location_hint: Option<&str>,
    ) -> ProviderResult<RegistryReport> {
        let queries = self.queries(organization, location_hint);
        let outcomes = join_all(
            queries
                .iter()
                .map(|q| self.search.search(q, self.max_results)),
        )
        .await;

        let mut first_error = None;
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        let mut answered = false;
        for outcome in outcomes {
            match outcome {
                Ok(batch) => {
                    answered = true;
                    hits.extend(batch.into_iter().filter(|h| seen.insert(h.link.clone())));
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if !answered && let Some(e) = first_error {
            return Err(e);
        }
        hits.truncate(MAX_REGISTRY_RESULTS);

        let official = hits.iter().find(|hit| {
            let link = hit.link.to_lowercase();
            self.markers.iter().any(|m| link.contains(m.as_str()))
        });

        let (registered, details, verification_status) = match official {
            Some(hit) => (
                true,
                Some(RegistryDetails {
                    source: hit.title.clone(),
                    url: Some(hit.link.clone()),
                    snippet: Some(hit.snippet.clone()),
                }),
                VerificationStatus::Verified,
            ),
            None => {
                let snippets = hits
                    .iter()
                    .take(REPUTATION_WINDOW)
                    .map(|h| h.snippet.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                let status = if REPUTABLE_KEYWORDS.iter().any(|k| snippets.contains(k)) {
                    VerificationStatus::LikelyLegitimate
                } else {
                    VerificationStatus::Unverified
                };
                (false, None, status)
            }
        };

        Ok(RegistryReport {
            organization: organization.to_string(),
            registered,
            details,
            verification_status,
            search_results: hits,
        })
    }
}

/// Recent news and announcements about an organization.
pub struct SearchUpdates {
    search: Arc<dyn WebSearch>,
    keywords: Vec<String>,
    max_results: usize,
}

impl SearchUpdates {
    pub fn new(config: &ProviderConfig, search: Arc<dyn WebSearch>) -> Self {
        Self {
            search,
            keywords: lowercase_all(&config.update_keywords),
            max_results: config.search_max_results,
        }
    }
}

#[async_trait]
impl UpdatesLookup for SearchUpdates {
    async fn recent_updates(
        &self,
        organization: &str,
        location_hint: Option<&str>,
    ) -> ProviderResult<RecentUpdatesReport> {
        let query = format!(
            "{} recent news OR updates",
            quoted_with_location(organization, location_hint)
        );
        let hits = self.search.search(&query, self.max_results).await?;

        let updates = hits
            .into_iter()
            .filter(|hit| {
                let text = hit_text(hit);
                self.keywords.iter().any(|k| text.contains(k.as_str()))
            })
            .map(|hit| UpdateEntry {
                title: hit.title,
                url: hit.link,
                snippet: hit.snippet,
            })
            .collect();

        Ok(RecentUpdatesReport {
            organization: organization.to_string(),
            updates,
        })
    }
}
