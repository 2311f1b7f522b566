//! JSON case-file evidence store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CaseRecord, EvidenceStore, VerdictFields, store_err_with};
use crate::case::CaseId;
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceItem;

const CASE_FILE_PREFIX: &str = "case_";

async fn sync_path(path: &Path, context: &str) -> Result<()> {
    let sync_path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::open(&sync_path).and_then(|file| file.sync_all())
    })
    .await
    .map_err(|e| store_err_with(context, e))?
    .map_err(|e| store_err_with(context, e))
}

pub struct FileEvidenceStore {
    cases_dir: PathBuf,
    locks: parking_lot::Mutex<HashMap<CaseId, Arc<Mutex<()>>>>,
}

impl FileEvidenceStore {
    pub fn new(cases_dir: &Path) -> Self {
        Self {
            cases_dir: cases_dir.to_path_buf(),
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cases_dir).await?;
        self.recover_interrupted_writes().await;
        Ok(())
    }

    fn case_path(&self, case_id: &CaseId) -> PathBuf {
        self.cases_dir
            .join(format!("{}{}.json", CASE_FILE_PREFIX, case_id))
    }

    fn case_lock(&self, case_id: &CaseId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(case_id.clone()).or_default())
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, content).await?;
        sync_path(&tmp_path, "Failed to sync case file").await?;
        fs::rename(&tmp_path, path).await?;

        if cfg!(unix)
            && let Some(parent) = path.parent()
        {
            sync_path(parent, "Failed to sync cases directory").await?;
        }

        debug!(path = %path.display(), "Atomic write completed");
        Ok(())
    }

    /// Forget the lock of a case that can no longer be written.
    fn release_lock(&self, case_id: &CaseId) {
        self.locks.lock().remove(case_id);
    }

    async fn recover_interrupted_writes(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.cases_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing interrupted write");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
    }

    async fn read_record(&self, case_id: &CaseId) -> Result<CaseRecord> {
        let path = self.case_path(case_id);
        if !path.exists() {
            return Err(EngineError::CaseNotFound(case_id.to_string()));
        }
        let content = fs::read_to_string(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| store_err_with(&format!("Corrupt case file {}", path.display()), e))
    }

    async fn write_record(&self, record: &CaseRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record)?;
        self.write_atomic(&self.case_path(&record.case_id), &content)
            .await
    }

    /// Load, mutate and rewrite a record while holding its case lock.
    async fn update<T>(
        &self,
        case_id: &CaseId,
        mutate: impl FnOnce(&mut CaseRecord) -> Result<T> + Send,
    ) -> Result<T> {
        let lock = self.case_lock(case_id);
        let _guard = lock.lock().await;

        let mut record = self.read_record(case_id).await?;
        let out = mutate(&mut record)?;
        self.write_record(&record).await?;
        Ok(out)
    }
}

#[async_trait]
impl EvidenceStore for FileEvidenceStore {
    async fn create(&self, record: &CaseRecord) -> Result<()> {
        let lock = self.case_lock(&record.case_id);
        let _guard = lock.lock().await;

        if self.case_path(&record.case_id).exists() {
            return Err(EngineError::CaseAlreadyExists(record.case_id.to_string()));
        }
        self.write_record(record).await?;
        debug!(case_id = %record.case_id, "Case file created");
        Ok(())
    }

    async fn append(&self, case_id: &CaseId, item: &EvidenceItem) -> Result<u64> {
        let item = item.clone();
        let seq = self
            .update(case_id, move |record| {
                record.ensure_open()?;
                record.evidence.push(item);
                Ok(record.evidence.len() as u64)
            })
            .await?;
        debug!(case_id = %case_id, seq, "Evidence appended");
        Ok(seq)
    }

    async fn read(&self, case_id: &CaseId) -> Result<Vec<EvidenceItem>> {
        Ok(self.read_record(case_id).await?.evidence)
    }

    async fn finalize(&self, case_id: &CaseId, fields: &VerdictFields) -> Result<()> {
        let fields = fields.clone();
        self.update(case_id, move |record| {
            record.ensure_open()?;
            record.apply_verdict(&fields);
            Ok(())
        })
        .await?;
        self.release_lock(case_id);
        Ok(())
    }

    async fn mark_failed(&self, case_id: &CaseId, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.update(case_id, move |record| {
            record.ensure_open()?;
            record.apply_failure(&reason, Utc::now());
            Ok(())
        })
        .await?;
        self.release_lock(case_id);
        Ok(())
    }

    async fn load(&self, case_id: &CaseId) -> Result<CaseRecord> {
        self.read_record(case_id).await
    }

    async fn list(&self) -> Result<Vec<CaseRecord>> {
        let mut records = Vec::new();
        if !self.cases_dir.exists() {
            return Ok(records);
        }

        let mut entries = fs::read_dir(&self.cases_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_case_file = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(CASE_FILE_PREFIX));
            if !is_case_file {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<CaseRecord>(&content) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping corrupt case file"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable case file"),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
