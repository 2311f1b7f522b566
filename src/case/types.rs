use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::identifier::{Identifier, dedupe_identifiers};
use super::machine::{CaseState, CaseStatus, StateTransition};
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceItem;
use crate::narrative::Narrative;
use crate::scoring::RiskAssessment;

const CASE_ID_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub(crate) String);

impl CaseId {
    pub fn new() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(raw.chars().take(CASE_ID_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ToSql for CaseId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.0.as_bytes())))
    }
}

impl FromSql for CaseId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(s) => std::str::from_utf8(s)
                .map(|s| Self(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// What the upstream extractor hands over for one artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionInput {
    pub identifiers: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location_hints: Vec<String>,
}

impl ExtractionInput {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self {
            identifiers,
            ..Default::default()
        }
    }

    pub fn with_raw_context(mut self, context: impl Into<String>) -> Self {
        self.raw_context = Some(context.into());
        self
    }

    pub fn with_location_hints(mut self, hints: Vec<String>) -> Self {
        self.location_hints = hints;
        self
    }
}

/// In-memory aggregate owned by the orchestrator while a case runs.
#[derive(Debug, Clone)]
pub struct Case {
    pub id: CaseId,
    pub created_at: DateTime<Utc>,
    pub state: CaseState,
    pub identifiers: Vec<Identifier>,
    pub location_hints: Vec<String>,
    pub raw_context: Option<String>,
    pub no_data: bool,
    pub timeline: Vec<EvidenceItem>,
    pub transitions: Vec<StateTransition>,
    pub assessment: Option<RiskAssessment>,
    pub narrative: Option<Narrative>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl Case {
    pub fn new(input: &ExtractionInput) -> Self {
        let identifiers = dedupe_identifiers(&input.identifiers);
        let location_hints = input
            .location_hints
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        Self {
            id: CaseId::new(),
            created_at: Utc::now(),
            state: CaseState::Created,
            no_data: identifiers.is_empty(),
            identifiers,
            location_hints,
            raw_context: input.raw_context.clone(),
            timeline: Vec::new(),
            transitions: Vec::new(),
            assessment: None,
            narrative: None,
            started_at: None,
            completed_at: None,
            failure_reason: None,
        }
    }

    pub fn status(&self) -> CaseStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition_to(&mut self, target: CaseState, reason: impl Into<String>) -> Result<()> {
        if !self.state.can_transition_to(target) {
            let allowed = self
                .state
                .allowed_transitions()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(EngineError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
                allowed: if allowed.is_empty() {
                    "none".to_string()
                } else {
                    allowed
                },
            });
        }

        let transition = StateTransition::new(self.state, target, reason);
        match target {
            CaseState::Gathering => self.started_at = Some(transition.at),
            CaseState::Finalized | CaseState::Failed => self.completed_at = Some(transition.at),
            _ => {}
        }
        self.state = target;
        self.transitions.push(transition);
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        let start = self.started_at.unwrap_or(self.created_at);
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - start).to_std().unwrap_or_default()
    }

    /// Location hint forwarded to registry lookups.
    pub fn location_hint(&self, max_hints: usize) -> Option<String> {
        if max_hints == 0 || self.location_hints.is_empty() {
            return None;
        }
        Some(
            self.location_hints
                .iter()
                .take(max_hints)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ExtractionInput {
        ExtractionInput::new(vec![
            Identifier::url("https://relief-aid.org/donate"),
            Identifier::domain("www.relief-aid.org"),
            Identifier::phone("+1 555 010 2000"),
        ])
    }

    #[test]
    fn test_new_case_dedupes_and_flags_no_data() {
        let case = Case::new(&input());
        assert_eq!(case.state, CaseState::Created);
        assert_eq!(case.identifiers.len(), 3);
        assert!(!case.no_data);

        let empty = Case::new(&ExtractionInput::default());
        assert!(empty.no_data);
        assert!(empty.identifiers.is_empty());
    }

    #[test]
    fn test_transitions_record_timestamps() {
        let mut case = Case::new(&input());
        case.transition_to(CaseState::Gathering, "identifiers received")
            .unwrap();
        assert!(case.started_at.is_some());

        case.transition_to(CaseState::Scoring, "checks settled").unwrap();
        case.transition_to(CaseState::Narrating, "scored").unwrap();
        case.transition_to(CaseState::Finalized, "narrated").unwrap();

        assert!(case.completed_at.is_some());
        assert_eq!(case.transitions.len(), 4);
        assert_eq!(case.status(), CaseStatus::Completed);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut case = Case::new(&input());
        let err = case
            .transition_to(CaseState::Finalized, "skip")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(case.state, CaseState::Created);
        assert!(case.transitions.is_empty());
    }

    #[test]
    fn test_terminal_case_rejects_everything() {
        let mut case = Case::new(&input());
        case.transition_to(CaseState::Failed, "store down").unwrap();
        let err = case.transition_to(CaseState::Gathering, "retry").unwrap_err();
        assert!(err.to_string().contains("allowed: none"));
    }

    #[test]
    fn test_location_hint_joins_first_hints() {
        let case = Case::new(&ExtractionInput::default().with_location_hints(vec![
            "Chennai".into(),
            " ".into(),
            "Tamil Nadu".into(),
            "India".into(),
        ]));
        assert_eq!(case.location_hint(2).as_deref(), Some("Chennai, Tamil Nadu"));
        assert_eq!(case.location_hint(0), None);
    }

    #[test]
    fn test_case_id_shape() {
        let id = CaseId::new();
        assert_eq!(id.as_str().len(), CASE_ID_LEN);
        assert_ne!(id, CaseId::new());
    }

    #[test]
    fn test_extraction_input_camel_case() {
        let input: ExtractionInput = serde_json::from_str(
            r#"{"identifiers": [{"type": "email", "value": "a@b.org"}], "rawContext": "flyer", "locationHints": ["Kerala"]}"#,
        )
        .unwrap();
        assert_eq!(input.raw_context.as_deref(), Some("flyer"));
        assert_eq!(input.location_hints, vec!["Kerala".to_string()]);
    }
}
