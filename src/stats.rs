//! Read-only counters over stored cases.

use serde::{Deserialize, Serialize};

use crate::case::CaseStatus;
use crate::scoring::Verdict;
use crate::store::CaseRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatistics {
    /// Cases that reached a verdict.
    pub monitored: usize,
    /// Completed cases judged `SCAM`.
    pub debunked: usize,
    pub suspicious: usize,
    pub safe: usize,
    pub failed: usize,
    pub investigating: usize,
}

impl CaseStatistics {
    pub fn from_records(records: &[CaseRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            match record.status {
                CaseStatus::Investigating => stats.investigating += 1,
                CaseStatus::Failed => stats.failed += 1,
                CaseStatus::Completed => {
                    stats.monitored += 1;
                    match record.verdict {
                        Some(Verdict::Scam) => stats.debunked += 1,
                        Some(Verdict::Suspicious) => stats.suspicious += 1,
                        Some(Verdict::Safe) => stats.safe += 1,
                        None => {}
                    }
                }
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.monitored + self.failed + self.investigating
    }

    pub fn debunk_rate(&self) -> f32 {
        if self.monitored == 0 {
            0.0
        } else {
            self.debunked as f32 / self.monitored as f32
        }
    }
}
