//! Durable, append-only evidence store keyed by case.
//!
//! Two backends sit behind `EvidenceStore`:
//! - `SqliteEvidenceStore`: dedicated writer thread plus read pool
//! - `FileEvidenceStore`: one atomically rewritten JSON file per case

mod files;
mod sqlite;
mod writer;

pub use files::FileEvidenceStore;
pub use sqlite::SqliteEvidenceStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{Case, CaseId, CaseStatus, Identifier};
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceItem;
use crate::narrative::NarrativeTier;
use crate::scoring::Verdict;

pub(crate) fn store_err(msg: impl std::fmt::Display) -> EngineError {
    EngineError::Store(msg.to_string())
}

pub(crate) fn store_err_with<E: std::fmt::Display>(context: &str, err: E) -> EngineError {
    EngineError::Store(format!("{}: {}", context, err))
}

pub(crate) fn invalid_state(case_id: &CaseId, status: CaseStatus) -> EngineError {
    EngineError::InvalidState {
        case_id: case_id.to_string(),
        status: status.to_string(),
    }
}

/// Fields written by the single finalize transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictFields {
    pub verdict: Verdict,
    pub risk_score: u32,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub narrative_tier: NarrativeTier,
    pub completed_at: DateTime<Utc>,
}

/// The persisted, human-inspectable case record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub case_id: CaseId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CaseStatus,
    pub identifiers: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_context: Option<String>,
    #[serde(default)]
    pub no_data: bool,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_tier: Option<NarrativeTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CaseRecord {
    pub fn new(case_id: CaseId, identifiers: Vec<Identifier>) -> Self {
        Self {
            case_id,
            created_at: Utc::now(),
            completed_at: None,
            status: CaseStatus::Investigating,
            no_data: identifiers.is_empty(),
            identifiers,
            location_hints: Vec::new(),
            raw_context: None,
            evidence: Vec::new(),
            verdict: None,
            risk_score: None,
            summary: None,
            recommendations: None,
            risk_factors: None,
            narrative_tier: None,
            failure_reason: None,
        }
    }

    /// Initial record for a case entering the store.
    pub fn from_case(case: &Case) -> Self {
        Self {
            created_at: case.created_at,
            location_hints: case.location_hints.clone(),
            raw_context: case.raw_context.clone(),
            no_data: case.no_data,
            ..Self::new(case.id.clone(), case.identifiers.clone())
        }
    }

    pub fn apply_verdict(&mut self, fields: &VerdictFields) {
        self.status = CaseStatus::Completed;
        self.completed_at = Some(fields.completed_at);
        self.verdict = Some(fields.verdict);
        self.risk_score = Some(fields.risk_score);
        self.summary = Some(fields.summary.clone());
        self.recommendations = Some(fields.recommendations.clone());
        self.risk_factors = Some(fields.risk_factors.clone());
        self.narrative_tier = Some(fields.narrative_tier);
    }

    pub fn apply_failure(&mut self, reason: &str, at: DateTime<Utc>) {
        self.status = CaseStatus::Failed;
        self.completed_at = Some(at);
        self.failure_reason = Some(reason.to_string());
    }

    pub fn verdict_fields(&self) -> Option<VerdictFields> {
        Some(VerdictFields {
            verdict: self.verdict?,
            risk_score: self.risk_score?,
            summary: self.summary.clone()?,
            recommendations: self.recommendations.clone().unwrap_or_default(),
            risk_factors: self.risk_factors.clone().unwrap_or_default(),
            narrative_tier: self.narrative_tier.unwrap_or(NarrativeTier::Template),
            completed_at: self.completed_at?,
        })
    }

    /// Rejects any mutation once the case is terminal.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(invalid_state(&self.case_id, self.status));
        }
        Ok(())
    }
}

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Register a new case in `investigating` state.
    async fn create(&self, record: &CaseRecord) -> Result<()>;

    /// Durably append one item. Returns its 1-based position in the timeline.
    async fn append(&self, case_id: &CaseId, item: &EvidenceItem) -> Result<u64>;

    /// The full timeline in append order.
    async fn read(&self, case_id: &CaseId) -> Result<Vec<EvidenceItem>>;

    /// The single terminal success transition.
    async fn finalize(&self, case_id: &CaseId, fields: &VerdictFields) -> Result<()>;

    async fn mark_failed(&self, case_id: &CaseId, reason: &str) -> Result<()>;

    async fn load(&self, case_id: &CaseId) -> Result<CaseRecord>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<CaseRecord>>;
}

/// Open the backend selected in configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn EvidenceStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let path = config.database_path();
            let store = tokio::task::spawn_blocking(move || SqliteEvidenceStore::new(path))
                .await
                .map_err(|e| store_err_with("Store init task failed", e))??;
            Ok(Arc::new(store))
        }
        StoreBackend::Files => {
            let store = FileEvidenceStore::new(&config.path);
            store.init().await?;
            Ok(Arc::new(store))
        }
    }
}
