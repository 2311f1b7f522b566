use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{EngineError, Result};
use crate::scoring::MAX_SCORE;

const ENV_PREFIX: &str = "RELIEF_VERIFY_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gathering: GatheringConfig,
    pub scoring: ScoringWeights,
    pub store: StoreConfig,
    pub providers: ProviderConfig,
    pub narrative: NarrativeConfig,
}

impl EngineConfig {
    /// Load from a TOML file. A missing file yields defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Credentials and endpoints may come from the environment so they stay out of config files.
    pub fn apply_env_overrides(&mut self) {
        let var = |name: &str| {
            std::env::var(format!("{ENV_PREFIX}{name}"))
                .ok()
                .filter(|v| !v.trim().is_empty())
        };

        if let Some(key) = var("GEMINI_API_KEY") {
            self.narrative.gemini_api_key = Some(key);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.narrative.openai_api_key = Some(key);
        }
        if let Some(key) = var("SEARCH_API_KEY") {
            self.providers.search_api_key = Some(key);
        }
        if let Some(id) = var("SEARCH_ENGINE_ID") {
            self.providers.search_engine_id = Some(id);
        }
        if let Some(url) = var("SCAM_DATABASE_URL") {
            self.providers.scam_database_url = Some(url);
        }
        if let Some(url) = var("REGISTRY_URL") {
            self.providers.registry_url = Some(url);
        }
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let g = &self.gathering;
        if g.check_timeout_ms == 0 {
            errors.push("gathering.check_timeout_ms must be greater than 0");
        }
        if g.case_budget_ms == 0 {
            errors.push("gathering.case_budget_ms must be greater than 0");
        }

        let s = &self.scoring;
        if s.very_new_domain_days == 0 {
            errors.push("scoring.very_new_domain_days must be greater than 0");
        }
        if s.very_new_domain_days >= s.established_domain_days {
            errors.push("scoring.very_new_domain_days must be less than established_domain_days");
        }
        for (weight, message) in [
            (s.no_data, "scoring.no_data must not exceed 100"),
            (s.very_new_domain, "scoring.very_new_domain must not exceed 100"),
            (s.new_domain, "scoring.new_domain must not exceed 100"),
            (s.scam_high, "scoring.scam_high must not exceed 100"),
            (s.scam_low, "scoring.scam_low must not exceed 100"),
            (s.unregistered_org, "scoring.unregistered_org must not exceed 100"),
        ] {
            if weight > MAX_SCORE {
                errors.push(message);
            }
        }

        if self.store.path.as_os_str().is_empty() {
            errors.push("store.path must not be empty");
        }

        let p = &self.providers;
        if p.request_timeout_ms == 0 {
            errors.push("providers.request_timeout_ms must be greater than 0");
        }
        if !(1..=10).contains(&p.search_max_results) {
            errors.push("providers.search_max_results must be between 1 and 10");
        }
        if p.search_api_key.is_some() != p.search_engine_id.is_some() {
            errors.push("providers.search_api_key and search_engine_id must be set together");
        }

        let n = &self.narrative;
        if n.request_timeout_ms == 0 {
            errors.push("narrative.request_timeout_ms must be greater than 0");
        }
        if n.max_tokens == 0 {
            errors.push("narrative.max_tokens must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatheringConfig {
    /// Timeout applied to every individual provider check.
    pub check_timeout_ms: u64,
    /// Overall budget for the gathering phase of one case.
    pub case_budget_ms: u64,
    /// How many location hints are forwarded to registry lookups.
    pub max_location_hints: usize,
}

impl GatheringConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn case_budget(&self) -> Duration {
        Duration::from_millis(self.case_budget_ms)
    }
}

impl Default for GatheringConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: 10_000,
            case_budget_ms: 30_000,
            max_location_hints: 2,
        }
    }
}

/// Additive rule weights. Verdict thresholds are fixed and live in `scoring`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub no_data: u32,
    pub very_new_domain: u32,
    pub new_domain: u32,
    /// Domains younger than this many days are "very new".
    pub very_new_domain_days: i64,
    /// Domains at least this many days old contribute nothing.
    pub established_domain_days: i64,
    pub scam_high: u32,
    pub scam_low: u32,
    pub unregistered_org: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            no_data: 50,
            very_new_domain: 30,
            new_domain: 15,
            very_new_domain_days: 30,
            established_domain_days: 365,
            scam_high: 40,
            scam_low: 20,
            unregistered_org: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Files,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding the database or the case files.
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn database_path(&self) -> PathBuf {
        self.path.join("evidence.db")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("case_files"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub rdap_base_url: String,
    pub scam_database_url: Option<String>,
    pub registry_url: Option<String>,
    #[serde(skip_serializing)]
    pub search_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub search_endpoint: String,
    pub search_max_results: usize,
    pub request_timeout_ms: u64,
    pub organization_type: String,
    /// Substrings that mark an identifier itself as a scam indicator.
    pub scam_keywords: Vec<String>,
    /// Words in search titles/snippets that count as scam reports.
    pub scam_indicators: Vec<String>,
    /// Link fragments treated as official registries.
    pub official_registry_markers: Vec<String>,
    pub update_keywords: Vec<String>,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn search_enabled(&self) -> bool {
        self.search_api_key.is_some() && self.search_engine_id.is_some()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            rdap_base_url: "https://rdap.org".to_string(),
            scam_database_url: None,
            registry_url: None,
            search_api_key: None,
            search_engine_id: None,
            search_endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            search_max_results: 5,
            request_timeout_ms: 10_000,
            organization_type: "ngo".to_string(),
            scam_keywords: words(&["scam", "fraud", "fake", "phishing"]),
            scam_indicators: words(&["scam", "fraud", "complaint", "warning", "fake", "phishing"]),
            official_registry_markers: words(&[
                ".gov",
                "nic.in",
                "charitycommission",
                "companieshouse",
                "redcross.org",
            ]),
            update_keywords: words(&["news", "update", "recent", "announcement"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_endpoint: String,
    pub request_timeout_ms: u64,
    pub max_tokens: u32,
}

impl NarrativeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_endpoint: "https://api.openai.com/v1".to_string(),
            request_timeout_ms: 15_000,
            max_tokens: 400,
        }
    }
}
