//! Evidence items and concurrent evidence gathering.

mod gatherer;
mod item;

pub use gatherer::{EvidenceGatherer, GatherReport, PlannedCheck, plan_checks};
pub use item::{
    DomainAgeReport, EvidenceItem, EvidencePayload, ProviderKind, RecentUpdatesReport,
    RegistryDetails, RegistryReport, RiskLevel, ScamMatch, ScamReport, SearchHit, UpdateEntry,
    VerificationStatus,
};
