use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Orchestrator-side lifecycle of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    #[default]
    Created,
    Gathering,
    Scoring,
    Narrating,
    Finalized,
    Failed,
}

impl CaseState {
    pub fn allowed_transitions(&self) -> &'static [CaseState] {
        use CaseState::*;
        match self {
            Created => &[Gathering, Failed],
            Gathering => &[Scoring, Failed],
            Scoring => &[Narrating, Failed],
            Narrating => &[Finalized, Failed],
            Finalized => &[],
            Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: CaseState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseState::Finalized | CaseState::Failed)
    }

    /// Status as persisted in the case record.
    pub fn status(&self) -> CaseStatus {
        match self {
            CaseState::Finalized => CaseStatus::Completed,
            CaseState::Failed => CaseStatus::Failed,
            _ => CaseStatus::Investigating,
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Gathering => "Gathering",
            Self::Scoring => "Scoring",
            Self::Narrating => "Narrating",
            Self::Finalized => "Finalized",
            Self::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a persisted case record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Investigating,
    Completed,
    Failed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investigating => "investigating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Investigating)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "investigating" => Some(Self::Investigating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CaseState,
    pub to: CaseState,
    pub reason: String,
    pub at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(from: CaseState, to: CaseState, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
            at: Utc::now(),
        }
    }
}
