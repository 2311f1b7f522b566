use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::case::{CaseId, CaseStatus};
use crate::cli::OutputFormat;
use crate::orchestrator::VerificationReport;
use crate::scoring::{RiskRules, Verdict};
use crate::stats::CaseStatistics;
use crate::store::CaseRecord;

/// Machine-readable output. Text rendering lives in `cli::Display`.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn emit_report(&self, report: &VerificationReport) {
        self.write_json(report);
    }

    /// Completed cases are emitted as their report; anything else as the raw record.
    pub fn emit_record(&self, record: &CaseRecord, rules: &RiskRules) {
        match VerificationReport::from_record(record, rules) {
            Some(report) => self.write_json(&report),
            None => self.write_json(record),
        }
    }

    pub fn emit_list(&self, records: &[CaseRecord]) {
        let list: Vec<CaseSummaryOutput> = records.iter().map(CaseSummaryOutput::from).collect();
        self.write_json(&list);
    }

    pub fn emit_stats(&self, stats: &CaseStatistics) {
        self.write_json(stats);
    }

    pub fn emit_error(&self, case_id: Option<&str>, message: &str) {
        self.write_json(&ErrorOutput {
            case_id: case_id.map(str::to_string),
            error: message.to_string(),
        });
    }

    fn write_json<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", json);
            let _ = stdout.flush();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummaryOutput {
    pub case_id: CaseId,
    pub created_at: DateTime<Utc>,
    pub status: CaseStatus,
    pub identifiers: usize,
    pub evidence: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u32>,
}

impl From<&CaseRecord> for CaseSummaryOutput {
    fn from(record: &CaseRecord) -> Self {
        Self {
            case_id: record.case_id.clone(),
            created_at: record.created_at,
            status: record.status,
            identifiers: record.identifiers.len(),
            evidence: record.evidence.len(),
            verdict: record.verdict,
            risk_score: record.risk_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    case_id: Option<String>,
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Identifier;

    #[test]
    fn test_summary_from_open_record() {
        let record = CaseRecord::new(CaseId::from("c9"), vec![Identifier::phone("+15550100")]);
        let summary = CaseSummaryOutput::from(&record);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["caseId"], "c9");
        assert_eq!(json["identifiers"], 1);
        assert!(json.get("verdict").is_none());
    }
}
