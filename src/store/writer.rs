//! Dedicated writer thread for the SQLite evidence store.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::{CaseRecord, VerdictFields, invalid_state, store_err, store_err_with};
use crate::case::{CaseId, CaseStatus};
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceItem;

pub(super) enum WriteCommand {
    Create {
        record: Box<CaseRecord>,
        response: oneshot::Sender<Result<()>>,
    },
    Append {
        case_id: CaseId,
        item: Box<EvidenceItem>,
        response: oneshot::Sender<Result<u64>>,
    },
    Finalize {
        case_id: CaseId,
        fields: Box<VerdictFields>,
        response: oneshot::Sender<Result<()>>,
    },
    MarkFailed {
        case_id: CaseId,
        reason: String,
        response: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

pub(super) struct EvidenceWriter {
    tx: Sender<WriteCommand>,
    handle: Option<JoinHandle<()>>,
}

impl EvidenceWriter {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WriteCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name("evidence-writer".into())
            .spawn(move || match Self::init_db(&db_path) {
                Ok(conn) => {
                    let _ = ready_tx.send(Ok(()));
                    Self::process_commands(&conn, rx);
                }
                Err(e) => {
                    error!(error = %e, "Evidence writer init failed");
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| store_err_with("Failed to spawn writer thread", e))?;

        ready_rx
            .recv()
            .map_err(|_| store_err("Writer thread died during init"))??;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> Sender<WriteCommand> {
        self.tx.clone()
    }

    fn init_db(db_path: &PathBuf) -> Result<Connection> {
        let conn =
            Connection::open(db_path).map_err(|e| store_err_with("Failed to open database", e))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .map_err(|e| store_err_with("Failed to enable WAL", e))?;
        Self::init_schema(&conn)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS cases (
                case_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL,
                identifiers TEXT NOT NULL,
                location_hints TEXT NOT NULL,
                raw_context TEXT,
                no_data INTEGER NOT NULL,
                verdict_fields TEXT,
                failure_reason TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_cases_created ON cases(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status);

            CREATE TABLE IF NOT EXISTS evidence (
                id TEXT PRIMARY KEY,
                case_id TEXT NOT NULL REFERENCES cases(case_id),
                seq INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                provider_kind TEXT NOT NULL,
                item TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_evidence_case_seq
                ON evidence(case_id, seq);

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );
            INSERT OR IGNORE INTO schema_version VALUES (1);
            ",
        )
        .map_err(|e| store_err_with("Failed to init schema", e))
    }

    fn process_commands(conn: &Connection, rx: Receiver<WriteCommand>) {
        for cmd in rx {
            match cmd {
                WriteCommand::Create { record, response } => {
                    let _ = response.send(Self::create_case(conn, &record));
                }
                WriteCommand::Append {
                    case_id,
                    item,
                    response,
                } => {
                    let _ = response.send(Self::append_item(conn, &case_id, &item));
                }
                WriteCommand::Finalize {
                    case_id,
                    fields,
                    response,
                } => {
                    let _ = response.send(Self::finalize_case(conn, &case_id, &fields));
                }
                WriteCommand::MarkFailed {
                    case_id,
                    reason,
                    response,
                } => {
                    let _ = response.send(Self::fail_case(conn, &case_id, &reason));
                }
                WriteCommand::Shutdown => {
                    debug!("Writer thread received shutdown signal");
                    break;
                }
            }
        }
    }

    fn case_status(tx: &Transaction<'_>, case_id: &CaseId) -> Result<CaseStatus> {
        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM cases WHERE case_id = ?1",
                params![case_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| store_err_with("Failed to read case status", e))?;

        let status = status.ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;
        CaseStatus::parse(&status)
            .ok_or_else(|| store_err(format!("Unknown case status '{}'", status)))
    }

    fn ensure_open(tx: &Transaction<'_>, case_id: &CaseId) -> Result<()> {
        let status = Self::case_status(tx, case_id)?;
        if status.is_terminal() {
            return Err(invalid_state(case_id, status));
        }
        Ok(())
    }

    fn create_case(conn: &Connection, record: &CaseRecord) -> Result<()> {
        let identifiers = serde_json::to_string(&record.identifiers)?;
        let hints = serde_json::to_string(&record.location_hints)?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO cases (case_id, created_at, status, identifiers, location_hints, raw_context, no_data)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &record.case_id,
                    record.created_at.to_rfc3339(),
                    CaseStatus::Investigating.as_str(),
                    identifiers,
                    hints,
                    &record.raw_context,
                    record.no_data,
                ],
            )
            .map_err(|e| store_err_with("Failed to insert case", e))?;

        if inserted == 0 {
            return Err(EngineError::CaseAlreadyExists(record.case_id.to_string()));
        }
        debug!(case_id = %record.case_id, "Case created");
        Ok(())
    }

    fn append_item(conn: &Connection, case_id: &CaseId, item: &EvidenceItem) -> Result<u64> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| store_err_with("Failed to start transaction", e))?;

        Self::ensure_open(&tx, case_id)?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT MAX(seq) FROM evidence WHERE case_id = ?1",
                params![case_id],
                |row| row.get(0),
            )
            .map_err(|e| store_err_with("Failed to read sequence", e))?;
        let seq = current.unwrap_or(0) + 1;

        let body = serde_json::to_string(item)?;
        tx.execute(
            "INSERT INTO evidence (id, case_id, seq, timestamp, provider_kind, item)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &item.id,
                case_id,
                seq,
                item.timestamp.to_rfc3339(),
                item.provider_kind.as_str(),
                body,
            ],
        )
        .map_err(|e| store_err_with("Failed to insert evidence", e))?;

        tx.commit()
            .map_err(|e| store_err_with("Failed to commit", e))?;

        debug!(
            case_id = %case_id,
            seq,
            provider = item.provider_kind.as_str(),
            "Evidence appended"
        );
        Ok(seq as u64)
    }

    fn finalize_case(conn: &Connection, case_id: &CaseId, fields: &VerdictFields) -> Result<()> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| store_err_with("Failed to start transaction", e))?;

        Self::ensure_open(&tx, case_id)?;

        let body = serde_json::to_string(fields)?;
        tx.execute(
            "UPDATE cases SET status = ?2, completed_at = ?3, verdict_fields = ?4 WHERE case_id = ?1",
            params![
                case_id,
                CaseStatus::Completed.as_str(),
                fields.completed_at.to_rfc3339(),
                body,
            ],
        )
        .map_err(|e| store_err_with("Failed to finalize case", e))?;

        tx.commit()
            .map_err(|e| store_err_with("Failed to commit", e))?;
        debug!(case_id = %case_id, verdict = %fields.verdict, "Case finalized");
        Ok(())
    }

    fn fail_case(conn: &Connection, case_id: &CaseId, reason: &str) -> Result<()> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| store_err_with("Failed to start transaction", e))?;

        Self::ensure_open(&tx, case_id)?;

        tx.execute(
            "UPDATE cases SET status = ?2, completed_at = ?3, failure_reason = ?4 WHERE case_id = ?1",
            params![
                case_id,
                CaseStatus::Failed.as_str(),
                Utc::now().to_rfc3339(),
                reason,
            ],
        )
        .map_err(|e| store_err_with("Failed to mark case failed", e))?;

        tx.commit()
            .map_err(|e| store_err_with("Failed to commit", e))?;
        Ok(())
    }
}

impl Drop for EvidenceWriter {
    fn drop(&mut self) {
        let _ = self.tx.send(WriteCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.join()
        {
            warn!("Writer thread panicked: {:?}", e);
        }
    }
}
