pub mod case;
pub mod cli;
pub mod config;
pub mod error;
pub mod evidence;
pub mod narrative;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod scoring;
pub mod stats;
pub mod store;

pub use case::{Case, CaseId, CaseState, CaseStatus, ExtractionInput, Identifier, IdentifierKind};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use evidence::{EvidenceGatherer, EvidenceItem, EvidencePayload, ProviderKind};
pub use narrative::{Narrative, NarrativeGenerator, NarrativeStrategy, NarrativeTier};
pub use orchestrator::{CaseOrchestrator, VerificationReport};
pub use providers::ProviderSet;
pub use scoring::{RiskAssessment, RiskScorer, Verdict};
pub use stats::CaseStatistics;
pub use store::{CaseRecord, EvidenceStore, open_store};
