//! SQLite evidence store: writer thread for mutations, read pool for queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tokio::sync::oneshot;

use super::writer::{EvidenceWriter, WriteCommand};
use super::{CaseRecord, EvidenceStore, VerdictFields, store_err, store_err_with};
use crate::case::{CaseId, CaseStatus, Identifier};
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceItem;

const DEFAULT_READ_POOL_SIZE: usize = 4;
const READ_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw case row: (case_id, created_at, completed_at, status, identifiers,
/// location_hints, raw_context, no_data, verdict_fields, failure_reason)
type CaseRowTuple = (
    CaseId,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    bool,
    Option<String>,
    Option<String>,
);

struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    fn new(db_path: &Path, size: usize) -> Result<Self> {
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size.max(1) {
            let conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| store_err_with("Failed to open read connection", e))?;
            conn.busy_timeout(READ_BUSY_TIMEOUT)
                .map_err(|e| store_err_with("Failed to set busy timeout", e))?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    fn acquire(&self) -> parking_lot::MutexGuard<'_, Connection> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[idx].lock()
    }
}

struct StoreInner {
    writer_tx: Sender<WriteCommand>,
    read_pool: ReadPool,
    db_path: PathBuf,
    /// Holds the writer thread. Dropping it shuts the thread down.
    #[allow(dead_code)]
    writer: EvidenceWriter,
}

#[derive(Clone)]
pub struct SqliteEvidenceStore {
    inner: Arc<StoreInner>,
}

impl SqliteEvidenceStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_read_pool_size(db_path, DEFAULT_READ_POOL_SIZE)
    }

    pub fn with_read_pool_size(db_path: impl AsRef<Path>, pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| store_err_with("Failed to create store directory", e))?;
        }

        let writer = EvidenceWriter::new(db_path.clone())?;
        let writer_tx = writer.sender();
        let read_pool = ReadPool::new(&db_path, pool_size)?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                writer_tx,
                read_pool,
                db_path,
                writer,
            }),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.inner.db_path
    }

    async fn send<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> WriteCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .writer_tx
            .send(build(tx))
            .map_err(|_| store_err("Writer thread disconnected"))?;
        rx.await
            .map_err(|_| store_err("Writer response channel dropped"))?
    }

    async fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = inner.read_pool.acquire();
            f(&guard)
        })
        .await
        .map_err(|e| store_err_with("Query task failed", e))?
    }

    fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| store_err_with("Invalid timestamp", e))
    }

    fn query_evidence(conn: &Connection, case_id: &CaseId) -> Result<Vec<EvidenceItem>> {
        let mut stmt = conn
            .prepare("SELECT item FROM evidence WHERE case_id = ?1 ORDER BY seq ASC")
            .map_err(|e| store_err_with("Failed to prepare statement", e))?;

        let rows = stmt
            .query_map(params![case_id], |row| row.get::<_, String>(0))
            .map_err(|e| store_err_with("Failed to query evidence", e))?;

        let mut items = Vec::new();
        for row in rows {
            let body = row.map_err(|e| store_err_with("Failed to read evidence row", e))?;
            items.push(serde_json::from_str(&body)?);
        }
        Ok(items)
    }

    fn case_exists(conn: &Connection, case_id: &CaseId) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM cases WHERE case_id = ?1",
            params![case_id],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|e| store_err_with("Failed to look up case", e))
    }

    fn query_record(conn: &Connection, case_id: &CaseId) -> Result<CaseRecord> {
        let row: Option<CaseRowTuple> = conn
            .query_row(
                "SELECT case_id, created_at, completed_at, status, identifiers, location_hints,
                        raw_context, no_data, verdict_fields, failure_reason
                   FROM cases WHERE case_id = ?1",
                params![case_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| store_err_with("Failed to query case", e))?;

        let row = row.ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;
        let mut record = Self::record_from_row(row)?;
        record.evidence = Self::query_evidence(conn, case_id)?;
        Ok(record)
    }

    fn record_from_row(row: CaseRowTuple) -> Result<CaseRecord> {
        let (
            case_id,
            created_at,
            completed_at,
            status,
            identifiers,
            location_hints,
            raw_context,
            no_data,
            verdict_fields,
            failure_reason,
        ) = row;

        let identifiers: Vec<Identifier> = serde_json::from_str(&identifiers)?;
        let mut record = CaseRecord::new(case_id, identifiers);
        record.created_at = Self::parse_time(&created_at)?;
        record.completed_at = completed_at.as_deref().map(Self::parse_time).transpose()?;
        record.status = CaseStatus::parse(&status)
            .ok_or_else(|| store_err(format!("Unknown case status '{}'", status)))?;
        record.location_hints = serde_json::from_str(&location_hints)?;
        record.raw_context = raw_context;
        record.no_data = no_data;
        record.failure_reason = failure_reason;

        if let Some(body) = verdict_fields {
            let fields: VerdictFields = serde_json::from_str(&body)?;
            record.apply_verdict(&fields);
        }
        Ok(record)
    }
}

#[async_trait]
impl EvidenceStore for SqliteEvidenceStore {
    async fn create(&self, record: &CaseRecord) -> Result<()> {
        let record = Box::new(record.clone());
        self.send(|response| WriteCommand::Create { record, response })
            .await
    }

    async fn append(&self, case_id: &CaseId, item: &EvidenceItem) -> Result<u64> {
        let case_id = case_id.clone();
        let item = Box::new(item.clone());
        self.send(|response| WriteCommand::Append {
            case_id,
            item,
            response,
        })
        .await
    }

    async fn read(&self, case_id: &CaseId) -> Result<Vec<EvidenceItem>> {
        let case_id = case_id.clone();
        self.with_reader(move |conn| {
            if !Self::case_exists(conn, &case_id)? {
                return Err(EngineError::CaseNotFound(case_id.to_string()));
            }
            Self::query_evidence(conn, &case_id)
        })
        .await
    }

    async fn finalize(&self, case_id: &CaseId, fields: &VerdictFields) -> Result<()> {
        let case_id = case_id.clone();
        let fields = Box::new(fields.clone());
        self.send(|response| WriteCommand::Finalize {
            case_id,
            fields,
            response,
        })
        .await
    }

    async fn mark_failed(&self, case_id: &CaseId, reason: &str) -> Result<()> {
        let case_id = case_id.clone();
        let reason = reason.to_string();
        self.send(|response| WriteCommand::MarkFailed {
            case_id,
            reason,
            response,
        })
        .await
    }

    async fn load(&self, case_id: &CaseId) -> Result<CaseRecord> {
        let case_id = case_id.clone();
        self.with_reader(move |conn| Self::query_record(conn, &case_id))
            .await
    }

    async fn list(&self) -> Result<Vec<CaseRecord>> {
        self.with_reader(|conn| {
            let mut stmt = conn
                .prepare("SELECT case_id FROM cases ORDER BY created_at DESC")
                .map_err(|e| store_err_with("Failed to prepare statement", e))?;
            let ids = stmt
                .query_map([], |row| row.get::<_, CaseId>(0))
                .map_err(|e| store_err_with("Failed to query cases", e))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| store_err_with("Failed to collect cases", e))?;

            ids.iter()
                .map(|id| Self::query_record(conn, id))
                .collect()
        })
        .await
    }
}
