use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{EvidenceItem, ProviderKind};
use crate::case::{Case, CaseId, Identifier};
use crate::config::GatheringConfig;
use crate::error::{EngineError, ProviderError, Result};
use crate::providers::ProviderSet;
use crate::scoring::RiskRules;
use crate::store::EvidenceStore;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider panicked".to_string()
    }
}

/// One (subject, provider) pair to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCheck {
    pub subject: Identifier,
    pub kind: ProviderKind,
}

/// Expand identifiers into checks. A URL and its bare domain share one subject.
pub fn plan_checks(identifiers: &[Identifier]) -> Vec<PlannedCheck> {
    let mut seen = HashSet::new();
    let mut checks = Vec::new();
    for identifier in identifiers {
        let Some(subject) = identifier.check_subject() else {
            continue;
        };
        for &kind in ProviderKind::applicable_to(subject.kind) {
            if seen.insert((subject.dedup_key(), kind)) {
                checks.push(PlannedCheck {
                    subject: subject.clone(),
                    kind,
                });
            }
        }
    }
    checks
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherReport {
    pub dispatched: usize,
    pub appended: usize,
    pub discarded: usize,
    pub budget_exceeded: bool,
    pub elapsed_ms: u64,
}

/// Per-case append gate. Once closed, late results are dropped.
struct Journal {
    open: bool,
    appended: usize,
    discarded: usize,
    store_error: Option<EngineError>,
}

type SharedJournal = Arc<Mutex<Journal>>;

async fn record(
    journal: &SharedJournal,
    store: &dyn EvidenceStore,
    case_id: &CaseId,
    item: EvidenceItem,
) {
    // Held across the store write so closing waits for in-flight appends.
    let mut journal = journal.lock().await;
    if !journal.open {
        journal.discarded += 1;
        debug!(
            case_id = %case_id,
            provider = item.provider_kind.as_str(),
            "Discarding late evidence"
        );
        return;
    }
    if journal.store_error.is_some() {
        return;
    }

    match store.append(case_id, &item).await {
        Ok(seq) => {
            journal.appended += 1;
            debug!(
                case_id = %case_id,
                seq,
                provider = item.provider_kind.as_str(),
                subject = %item.identifier,
                inconclusive = item.is_inconclusive(),
                "Evidence recorded"
            );
        }
        Err(e) => {
            error!(case_id = %case_id, error = %e, "Evidence append failed");
            journal.store_error = Some(e);
        }
    }
}

pub struct EvidenceGatherer {
    providers: ProviderSet,
    store: Arc<dyn EvidenceStore>,
    rules: RiskRules,
    config: GatheringConfig,
}

impl EvidenceGatherer {
    pub fn new(
        providers: ProviderSet,
        store: Arc<dyn EvidenceStore>,
        rules: RiskRules,
        config: GatheringConfig,
    ) -> Self {
        Self {
            providers,
            store,
            rules,
            config,
        }
    }

    /// Fan out every planned check and wait for all of them to settle, or
    /// for the case budget to run out.
    ///
    /// Provider failures become inconclusive items. Only a store failure is
    /// returned as an error.
    pub async fn gather(&self, case: &Case) -> Result<GatherReport> {
        let started = Instant::now();
        let checks = plan_checks(&case.identifiers);
        if checks.is_empty() {
            debug!(case_id = %case.id, "No identifiers, skipping evidence gathering");
            return Ok(GatherReport::default());
        }

        let journal: SharedJournal = Arc::new(Mutex::new(Journal {
            open: true,
            appended: 0,
            discarded: 0,
            store_error: None,
        }));
        let location_hint = case.location_hint(self.config.max_location_hints);
        let check_timeout = self.config.check_timeout();
        let dispatched = checks.len();

        info!(case_id = %case.id, checks = dispatched, "Gathering evidence");

        let mut tasks = JoinSet::new();
        for check in checks {
            let providers = self.providers.clone();
            let store = Arc::clone(&self.store);
            let rules = self.rules.clone();
            let journal = Arc::clone(&journal);
            let case_id = case.id.clone();
            let hint = location_hint.clone();

            tasks.spawn(async move {
                let PlannedCheck { subject, kind } = check;
                let timed = async {
                    match tokio::time::timeout(
                        check_timeout,
                        providers.check(kind, &subject, hint.as_deref()),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(ProviderError::timeout(kind.as_str(), check_timeout)),
                    }
                };

                // Runs inside this task so that aborting the task cancels the provider call.
                let caught = AssertUnwindSafe(timed).catch_unwind().await;
                let item = match caught {
                    Ok(outcome) => EvidenceItem::from_outcome(subject, kind, outcome, &rules),
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        warn!(provider = kind.as_str(), error = %message, "Provider check panicked");
                        EvidenceItem::inconclusive(
                            subject,
                            kind,
                            format!("check aborted: {}", message),
                        )
                    }
                };
                record(&journal, store.as_ref(), &case_id, item).await;
            });
        }

        let budget = self.config.case_budget();
        let settled = tokio::time::timeout(budget, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(case_id = %case.id, error = %e, "Evidence task failed");
                }
            }
        })
        .await
        .is_ok();

        let report = {
            let mut journal = journal.lock().await;
            journal.open = false;
            if let Some(e) = journal.store_error.take() {
                return Err(e);
            }
            GatherReport {
                dispatched,
                appended: journal.appended,
                discarded: journal.discarded,
                budget_exceeded: !settled,
                elapsed_ms: elapsed_ms(started.elapsed()),
            }
        };
        tasks.abort_all();

        if report.budget_exceeded {
            warn!(
                case_id = %case.id,
                budget_ms = self.config.case_budget_ms,
                appended = report.appended,
                dispatched,
                "Case budget exceeded, abandoning in-flight checks"
            );
        } else {
            info!(
                case_id = %case.id,
                appended = report.appended,
                elapsed_ms = report.elapsed_ms,
                "Evidence gathering settled"
            );
        }
        Ok(report)
    }
}

fn elapsed_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}
