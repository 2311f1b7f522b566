use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::report::VerificationReport;
use crate::case::{Case, CaseId, CaseState, ExtractionInput};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::evidence::EvidenceGatherer;
use crate::narrative::{NarrativeGenerator, NarrativeRequest};
use crate::providers::ProviderSet;
use crate::scoring::{RiskRules, RiskScorer};
use crate::stats::CaseStatistics;
use crate::store::{CaseRecord, EvidenceStore, VerdictFields, open_store};

/// Drives one case at a time through
/// `Created -> Gathering -> Scoring -> Narrating -> Finalized`.
///
/// Holds no per-case state, so independent cases may run concurrently on
/// the same orchestrator.
pub struct CaseOrchestrator {
    store: Arc<dyn EvidenceStore>,
    gatherer: EvidenceGatherer,
    scorer: RiskScorer,
    narrator: NarrativeGenerator,
}

impl CaseOrchestrator {
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        providers: ProviderSet,
        narrator: NarrativeGenerator,
        config: &EngineConfig,
    ) -> Self {
        let scorer = RiskScorer::new(config.scoring.clone());
        let gatherer = EvidenceGatherer::new(
            providers,
            Arc::clone(&store),
            scorer.rules().clone(),
            config.gathering.clone(),
        );

        Self {
            store,
            gatherer,
            scorer,
            narrator,
        }
    }

    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let store = open_store(&config.store).await?;
        let providers = ProviderSet::from_config(&config.providers)?;
        let narrator = NarrativeGenerator::from_config(&config.narrative)?;
        Ok(Self::new(store, providers, narrator, config))
    }

    pub fn store(&self) -> &Arc<dyn EvidenceStore> {
        &self.store
    }

    pub fn rules(&self) -> &RiskRules {
        self.scorer.rules()
    }

    /// Investigate one extraction and return its verdict.
    ///
    /// Only store failures end a case without a verdict; they surface as
    /// `EngineError::CaseFailed`.
    pub async fn run(&self, input: &ExtractionInput) -> Result<VerificationReport> {
        let mut case = Case::new(input);
        info!(
            case_id = %case.id,
            identifiers = case.identifiers.len(),
            no_data = case.no_data,
            "Case opened"
        );

        if let Err(e) = self.store.create(&CaseRecord::from_case(&case)).await {
            // Nothing of ours was persisted, so there is no record to mark.
            return Err(self.fail(&mut case, e, false).await);
        }

        match self.investigate(&mut case).await {
            Ok(report) => Ok(report),
            Err(e) => Err(self.fail(&mut case, e, true).await),
        }
    }

    async fn investigate(&self, case: &mut Case) -> Result<VerificationReport> {
        let reason = format!("{} identifiers received", case.identifiers.len());
        advance(case, CaseState::Gathering, reason)?;

        let gathered = self.gatherer.gather(case).await?;
        case.timeline = self.store.read(&case.id).await?;

        let reason = if gathered.budget_exceeded {
            format!(
                "case budget exceeded with {}/{} checks recorded",
                gathered.appended, gathered.dispatched
            )
        } else {
            format!("{} checks settled", gathered.dispatched)
        };
        advance(case, CaseState::Scoring, reason)?;

        let assessment = self.scorer.score(&case.timeline, case.no_data);
        debug!(
            case_id = %case.id,
            score = assessment.score,
            factors = assessment.risk_factors.len(),
            "Risk scored"
        );
        advance(
            case,
            CaseState::Narrating,
            format!("scored {} ({})", assessment.score, assessment.verdict),
        )?;

        let narrative = self
            .narrator
            .generate(&NarrativeRequest {
                assessment: &assessment,
                timeline: &case.timeline,
                identifiers: &case.identifiers,
            })
            .await;

        let fields = VerdictFields {
            verdict: assessment.verdict,
            risk_score: assessment.score,
            summary: narrative.summary.clone(),
            recommendations: narrative.recommendations.clone(),
            risk_factors: assessment.risk_factors.clone(),
            narrative_tier: narrative.tier,
            completed_at: Utc::now(),
        };
        self.store.finalize(&case.id, &fields).await?;
        advance(
            case,
            CaseState::Finalized,
            format!("verdict {} via {} narrative", assessment.verdict, narrative.tier),
        )?;

        let elapsed_ms = case.elapsed().as_millis() as u64;
        let report = VerificationReport::build(
            case.id.clone(),
            &case.identifiers,
            &case.timeline,
            &assessment,
            &narrative,
            self.scorer.rules(),
            elapsed_ms,
        );

        info!(
            case_id = %case.id,
            verdict = %assessment.verdict,
            score = assessment.score,
            evidence = case.timeline.len(),
            elapsed_ms,
            "Case finalized"
        );

        case.assessment = Some(assessment);
        case.narrative = Some(narrative);
        Ok(report)
    }

    async fn fail(&self, case: &mut Case, cause: EngineError, persisted: bool) -> EngineError {
        let reason = cause.to_string();
        error!(case_id = %case.id, state = %case.state, error = %reason, "Case failed");

        if let Err(e) = advance(case, CaseState::Failed, reason.clone()) {
            warn!(case_id = %case.id, error = %e, "Could not record failure transition");
        }
        case.failure_reason = Some(reason.clone());

        if persisted && let Err(e) = self.store.mark_failed(&case.id, &reason).await {
            warn!(case_id = %case.id, error = %e, "Failed to mark case as failed in store");
        }

        EngineError::CaseFailed {
            case_id: case.id.to_string(),
            reason,
        }
    }

    pub async fn show(&self, case_id: &CaseId) -> Result<CaseRecord> {
        self.store.load(case_id).await
    }

    pub async fn list_cases(&self) -> Result<Vec<CaseRecord>> {
        self.store.list().await
    }

    pub async fn statistics(&self) -> Result<CaseStatistics> {
        let records = self.store.list().await?;
        Ok(CaseStatistics::from_records(&records))
    }
}

fn advance(case: &mut Case, target: CaseState, reason: String) -> Result<()> {
    let from = case.state;
    case.transition_to(target, reason.clone())?;
    info!(case_id = %case.id, %from, to = %target, %reason, "Case transition");
    Ok(())
}
