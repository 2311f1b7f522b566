//! Store wrappers that fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use relief_verify::case::CaseId;
use relief_verify::error::{EngineError, Result};
use relief_verify::evidence::EvidenceItem;
use relief_verify::store::{CaseRecord, EvidenceStore, FileEvidenceStore, VerdictFields};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Create,
    /// Fail the append after this many successful ones.
    Append { after: usize },
    Read,
    Finalize,
}

/// Delegates to a real store and fails one operation.
pub struct FailingStore {
    inner: Arc<dyn EvidenceStore>,
    fail_at: FailPoint,
    appends: AtomicUsize,
    mark_failed_calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn EvidenceStore>, fail_at: FailPoint) -> Self {
        Self {
            inner,
            fail_at,
            appends: AtomicUsize::new(0),
            mark_failed_calls: AtomicUsize::new(0),
        }
    }

    pub fn mark_failed_calls(&self) -> usize {
        self.mark_failed_calls.load(Ordering::SeqCst)
    }

    fn unavailable(op: &str) -> EngineError {
        EngineError::Store(format!("{} failed: disk unavailable", op))
    }
}

#[async_trait]
impl EvidenceStore for FailingStore {
    async fn create(&self, record: &CaseRecord) -> Result<()> {
        if self.fail_at == FailPoint::Create {
            return Err(Self::unavailable("create"));
        }
        self.inner.create(record).await
    }

    async fn append(&self, case_id: &CaseId, item: &EvidenceItem) -> Result<u64> {
        if let FailPoint::Append { after } = self.fail_at
            && self.appends.fetch_add(1, Ordering::SeqCst) >= after
        {
            return Err(Self::unavailable("append"));
        }
        self.inner.append(case_id, item).await
    }

    async fn read(&self, case_id: &CaseId) -> Result<Vec<EvidenceItem>> {
        if self.fail_at == FailPoint::Read {
            return Err(Self::unavailable("read"));
        }
        self.inner.read(case_id).await
    }

    async fn finalize(&self, case_id: &CaseId, fields: &VerdictFields) -> Result<()> {
        if self.fail_at == FailPoint::Finalize {
            return Err(Self::unavailable("finalize"));
        }
        self.inner.finalize(case_id, fields).await
    }

    async fn mark_failed(&self, case_id: &CaseId, reason: &str) -> Result<()> {
        self.mark_failed_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_failed(case_id, reason).await
    }

    async fn load(&self, case_id: &CaseId) -> Result<CaseRecord> {
        self.inner.load(case_id).await
    }

    async fn list(&self) -> Result<Vec<CaseRecord>> {
        self.inner.list().await
    }
}

pub async fn file_store() -> (TempDir, Arc<dyn EvidenceStore>) {
    let dir = TempDir::new().unwrap();
    let store = FileEvidenceStore::new(dir.path());
    store.init().await.unwrap();
    (dir, Arc::new(store))
}
