//! Case orchestration.
//!
//! - `CaseOrchestrator`: runs a case through its lifecycle and persists the verdict
//! - `VerificationReport`: the caller-facing verdict with entities and sources

mod engine;
mod report;

pub use engine::CaseOrchestrator;
pub use report::{
    EntityReport, SourceLink, VerificationReport, collect_sources, entity_reports,
};
