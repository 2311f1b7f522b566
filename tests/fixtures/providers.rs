//! Scripted providers for testing without network access.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use relief_verify::case::IdentifierKind;
use relief_verify::error::ProviderError;
use relief_verify::evidence::{
    DomainAgeReport, RecentUpdatesReport, RegistryDetails, RegistryReport, RiskLevel, ScamMatch,
    ScamReport, UpdateEntry, VerificationStatus,
};
use relief_verify::providers::{
    DomainAgeLookup, ProviderResult, ProviderSet, RegistryLookup, ScamLookup, UpdatesLookup,
};

#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Ok(T),
    Err(ProviderError),
    Panic,
}

/// What one provider call does: an optional delay, then an outcome.
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    delay: Duration,
    outcome: Outcome<T>,
}

impl<T: Clone> Scripted<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Ok(value),
        }
    }

    pub fn err(error: ProviderError) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Err(error),
        }
    }

    pub fn panics() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Panic,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn play(&self) -> ProviderResult<T> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.outcome {
            Outcome::Ok(value) => Ok(value.clone()),
            Outcome::Err(e) => Err(e.clone()),
            Outcome::Panic => panic!("scripted provider panic"),
        }
    }
}

/// Per-subject scripts with a fallback, counting every call.
pub struct MockProvider<T> {
    scripts: RwLock<HashMap<String, Scripted<T>>>,
    fallback: Scripted<T>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl<T: Clone + Send + Sync> MockProvider<T> {
    pub fn new(fallback: Scripted<T>) -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            fallback,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn with(self, subject: &str, script: Scripted<T>) -> Self {
        self.scripts.write().insert(subject.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end of their script.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    async fn run(&self, subject: &str) -> ProviderResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .read()
            .get(subject)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        let result = script.play().await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl DomainAgeLookup for MockProvider<DomainAgeReport> {
    async fn check_domain_age(&self, domain: &str) -> ProviderResult<DomainAgeReport> {
        self.run(domain).await
    }
}

#[async_trait]
impl ScamLookup for MockProvider<ScamReport> {
    async fn check_scam_match(
        &self,
        identifier: &str,
        _kind: IdentifierKind,
    ) -> ProviderResult<ScamReport> {
        self.run(identifier).await
    }
}

#[async_trait]
impl RegistryLookup for MockProvider<RegistryReport> {
    async fn check_registry(
        &self,
        organization: &str,
        _location_hint: Option<&str>,
    ) -> ProviderResult<RegistryReport> {
        self.run(organization).await
    }
}

#[async_trait]
impl UpdatesLookup for MockProvider<RecentUpdatesReport> {
    async fn recent_updates(
        &self,
        organization: &str,
        _location_hint: Option<&str>,
    ) -> ProviderResult<RecentUpdatesReport> {
        self.run(organization).await
    }
}

pub struct MockProviders {
    pub domain_age: Arc<MockProvider<DomainAgeReport>>,
    pub scam: Arc<MockProvider<ScamReport>>,
    pub registry: Arc<MockProvider<RegistryReport>>,
    pub updates: Arc<MockProvider<RecentUpdatesReport>>,
}

impl MockProviders {
    /// Every check comes back clean.
    pub fn clean() -> Self {
        Self::new(
            MockProvider::new(Scripted::ok(domain_report("example.org", Some(3650)))),
            MockProvider::new(Scripted::ok(scam_report("", RiskLevel::None))),
            MockProvider::new(Scripted::ok(registry_report("", true))),
            MockProvider::new(Scripted::ok(updates_report("", 0))),
        )
    }

    pub fn new(
        domain_age: MockProvider<DomainAgeReport>,
        scam: MockProvider<ScamReport>,
        registry: MockProvider<RegistryReport>,
        updates: MockProvider<RecentUpdatesReport>,
    ) -> Self {
        Self {
            domain_age: Arc::new(domain_age),
            scam: Arc::new(scam),
            registry: Arc::new(registry),
            updates: Arc::new(updates),
        }
    }

    pub fn with_domain_age(mut self, provider: MockProvider<DomainAgeReport>) -> Self {
        self.domain_age = Arc::new(provider);
        self
    }

    pub fn with_scam(mut self, provider: MockProvider<ScamReport>) -> Self {
        self.scam = Arc::new(provider);
        self
    }

    pub fn with_registry(mut self, provider: MockProvider<RegistryReport>) -> Self {
        self.registry = Arc::new(provider);
        self
    }

    pub fn with_updates(mut self, provider: MockProvider<RecentUpdatesReport>) -> Self {
        self.updates = Arc::new(provider);
        self
    }

    pub fn set(&self) -> ProviderSet {
        ProviderSet::new(
            self.domain_age.clone(),
            self.scam.clone(),
            self.registry.clone(),
            self.updates.clone(),
        )
    }

    pub fn total_calls(&self) -> usize {
        self.domain_age.calls() + self.scam.calls() + self.registry.calls() + self.updates.calls()
    }
}

pub fn domain_report(domain: &str, age_days: Option<i64>) -> DomainAgeReport {
    DomainAgeReport {
        domain: domain.to_string(),
        registered: age_days.is_some(),
        age_days,
        registrar: age_days.map(|_| "Example Registrar".to_string()),
        created_at: None,
    }
}

pub fn scam_report(identifier: &str, level: RiskLevel) -> ScamReport {
    let matches = match level {
        RiskLevel::None => vec![],
        _ => vec![ScamMatch {
            pattern: identifier.to_string(),
            reason: "reported in relief fraud alerts".to_string(),
            source_url: Some("https://alerts.example/1".to_string()),
        }],
    };
    ScamReport {
        identifier: identifier.to_string(),
        kind: IdentifierKind::Phone,
        risk_level: level,
        matches,
        search_results: vec![],
    }
}

pub fn registry_report(organization: &str, registered: bool) -> RegistryReport {
    RegistryReport {
        organization: organization.to_string(),
        registered,
        details: registered.then(|| RegistryDetails {
            source: "Charity Commission".to_string(),
            url: Some("https://register.example.gov/org".to_string()),
            snippet: None,
        }),
        verification_status: if registered {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Unverified
        },
        search_results: vec![],
    }
}

pub fn updates_report(organization: &str, count: usize) -> RecentUpdatesReport {
    RecentUpdatesReport {
        organization: organization.to_string(),
        updates: (0..count)
            .map(|i| UpdateEntry {
                title: format!("Relief update {}", i + 1),
                url: format!("https://news.example/{}", i + 1),
                snippet: String::new(),
            })
            .collect(),
    }
}
