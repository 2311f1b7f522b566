//! Evidence providers: remote capabilities invoked per check subject.
//!
//! Each capability is a trait so alternate sources can be wired in without
//! touching the gatherer. `ProviderSet` bundles one implementation of each.

mod http;
mod search;

pub use http::{CustomSearchClient, RdapDomainAge, RegistryApiClient, ScamDatabaseClient};
pub use search::{SearchRegistry, SearchScamScreen, SearchUpdates};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::case::{Identifier, IdentifierKind};
use crate::config::ProviderConfig;
use crate::error::{EngineError, ProviderError, Result};
use crate::evidence::{
    DomainAgeReport, EvidencePayload, ProviderKind, RecentUpdatesReport, RegistryReport,
    ScamReport, SearchHit,
};

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait DomainAgeLookup: Send + Sync {
    async fn check_domain_age(&self, domain: &str) -> ProviderResult<DomainAgeReport>;
}

#[async_trait]
pub trait ScamLookup: Send + Sync {
    async fn check_scam_match(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> ProviderResult<ScamReport>;
}

#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn check_registry(
        &self,
        organization: &str,
        location_hint: Option<&str>,
    ) -> ProviderResult<RegistryReport>;
}

#[async_trait]
pub trait UpdatesLookup: Send + Sync {
    async fn recent_updates(
        &self,
        organization: &str,
        location_hint: Option<&str>,
    ) -> ProviderResult<RecentUpdatesReport>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchHit>>;
}

/// Stands in for a capability that has no configured backend.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    what: &'static str,
}

impl Unconfigured {
    pub fn new(what: &'static str) -> Self {
        Self { what }
    }

    fn error(&self) -> ProviderError {
        ProviderError::Unavailable(format!("no {} source configured", self.what))
    }
}

#[async_trait]
impl RegistryLookup for Unconfigured {
    async fn check_registry(&self, _: &str, _: Option<&str>) -> ProviderResult<RegistryReport> {
        Err(self.error())
    }
}

#[async_trait]
impl UpdatesLookup for Unconfigured {
    async fn recent_updates(
        &self,
        _: &str,
        _: Option<&str>,
    ) -> ProviderResult<RecentUpdatesReport> {
        Err(self.error())
    }
}

#[derive(Clone)]
pub struct ProviderSet {
    pub domain_age: Arc<dyn DomainAgeLookup>,
    pub scam: Arc<dyn ScamLookup>,
    pub registry: Arc<dyn RegistryLookup>,
    pub updates: Arc<dyn UpdatesLookup>,
}

impl ProviderSet {
    pub fn new(
        domain_age: Arc<dyn DomainAgeLookup>,
        scam: Arc<dyn ScamLookup>,
        registry: Arc<dyn RegistryLookup>,
        updates: Arc<dyn UpdatesLookup>,
    ) -> Self {
        Self {
            domain_age,
            scam,
            registry,
            updates,
        }
    }

    /// Wire HTTP-backed providers from configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("relief-verify/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let search: Option<Arc<dyn WebSearch>> =
            match (&config.search_api_key, &config.search_engine_id) {
                (Some(key), Some(engine)) => Some(Arc::new(CustomSearchClient::new(
                    client.clone(),
                    &config.search_endpoint,
                    key,
                    engine,
                ))),
                _ => None,
            };

        let domain_age = Arc::new(RdapDomainAge::new(client.clone(), &config.rdap_base_url));

        let database: Option<Arc<dyn ScamLookup>> = config.scam_database_url.as_ref().map(|url| {
            Arc::new(ScamDatabaseClient::new(client.clone(), url)) as Arc<dyn ScamLookup>
        });
        let scam = Arc::new(SearchScamScreen::new(config, search.clone(), database));

        let registry: Arc<dyn RegistryLookup> = match (&config.registry_url, &search) {
            (Some(url), _) => Arc::new(RegistryApiClient::new(
                client.clone(),
                url,
                &config.organization_type,
            )),
            (None, Some(search)) => Arc::new(SearchRegistry::new(config, Arc::clone(search))),
            (None, None) => Arc::new(Unconfigured::new("registry")),
        };

        let updates: Arc<dyn UpdatesLookup> = match &search {
            Some(search) => Arc::new(SearchUpdates::new(config, Arc::clone(search))),
            None => Arc::new(Unconfigured::new("web search")),
        };

        debug!(
            search = search.is_some(),
            scam_database = config.scam_database_url.is_some(),
            registry_api = config.registry_url.is_some(),
            "Providers configured"
        );

        Ok(Self::new(domain_age, scam, registry, updates))
    }

    /// Run one check of `kind` against `subject`.
    pub async fn check(
        &self,
        kind: ProviderKind,
        subject: &Identifier,
        location_hint: Option<&str>,
    ) -> ProviderResult<EvidencePayload> {
        let value = subject.value.as_str();
        match kind {
            ProviderKind::DomainAge => self
                .domain_age
                .check_domain_age(value)
                .await
                .map(EvidencePayload::DomainAge),
            ProviderKind::ScamMatch => self
                .scam
                .check_scam_match(value, subject.kind)
                .await
                .map(EvidencePayload::ScamMatch),
            ProviderKind::Registry => self
                .registry
                .check_registry(value, location_hint)
                .await
                .map(EvidencePayload::Registry),
            ProviderKind::RecentUpdate => self
                .updates
                .recent_updates(value, location_hint)
                .await
                .map(EvidencePayload::RecentUpdates),
        }
    }
}
