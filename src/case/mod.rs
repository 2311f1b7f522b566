//! Cases, their identifiers, and the case lifecycle state machine.

mod identifier;
mod machine;
mod types;

pub use identifier::{Identifier, IdentifierKind, dedupe_identifiers, normalize_domain};
pub use machine::{CaseState, CaseStatus, StateTransition};
pub use types::{Case, CaseId, ExtractionInput};
