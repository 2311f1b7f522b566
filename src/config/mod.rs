//! Configuration types and loading.
//!
//! Provides all configuration structures for relief-verify:
//! - `EngineConfig`: Top-level configuration with validation
//! - `GatheringConfig`: Per-check timeouts and the case budget
//! - `ScoringWeights`: Additive risk rule weights
//! - `StoreConfig`, `ProviderConfig`, `NarrativeConfig`: Collaborator settings

mod settings;

pub use settings::{
    EngineConfig, GatheringConfig, NarrativeConfig, ProviderConfig, ScoringWeights, StoreBackend,
    StoreConfig,
};
