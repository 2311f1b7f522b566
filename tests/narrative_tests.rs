//! Narrative tier fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use relief_verify::case::Identifier;
use relief_verify::error::NarrativeError;
use relief_verify::narrative::{
    NarrativeGenerator, NarrativeRequest, NarrativeStrategy, NarrativeTier, recommendations_for,
};
use relief_verify::scoring::{RiskAssessment, Verdict};

enum Behavior {
    Reply(&'static str),
    Fail(NarrativeError),
    Hang,
}

struct ScriptedNarrator {
    tier: NarrativeTier,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl ScriptedNarrator {
    fn boxed(tier: NarrativeTier, behavior: Behavior) -> (Box<dyn NarrativeStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let narrator = Self {
            tier,
            behavior,
            calls: Arc::clone(&calls),
        };
        (Box::new(narrator), calls)
    }
}

#[async_trait]
impl NarrativeStrategy for ScriptedNarrator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn tier(&self) -> NarrativeTier {
        self.tier
    }

    async fn compose(&self, _request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("too late".to_string())
            }
        }
    }
}

fn assessment() -> RiskAssessment {
    RiskAssessment {
        score: 72,
        verdict: Verdict::Scam,
        risk_factors: vec![
            "Domain give-now.org is very new (4 days old)".into(),
            "High risk match in scam database: +15550100".into(),
        ],
    }
}

fn identifiers() -> Vec<Identifier> {
    vec![Identifier::domain("give-now.org"), Identifier::phone("+15550100")]
}

#[tokio::test]
async fn test_first_successful_tier_wins() {
    let (rich, rich_calls) = ScriptedNarrator::boxed(
        NarrativeTier::Rich,
        Behavior::Reply("This flyer shows strong signs of fraud."),
    );
    let (secondary, secondary_calls) =
        ScriptedNarrator::boxed(NarrativeTier::Secondary, Behavior::Reply("unused"));
    let generator = NarrativeGenerator::new(vec![rich, secondary], Duration::from_secs(1));

    let assessment = assessment();
    let ids = identifiers();
    let narrative = generator
        .generate(&NarrativeRequest {
            assessment: &assessment,
            timeline: &[],
            identifiers: &ids,
        })
        .await;

    assert_eq!(narrative.tier, NarrativeTier::Rich);
    assert_eq!(narrative.summary, "This flyer shows strong signs of fraud.");
    assert_eq!(rich_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_falls_through_to_secondary() {
    let (rich, _) = ScriptedNarrator::boxed(
        NarrativeTier::Rich,
        Behavior::Fail(NarrativeError::Request("503 Service Unavailable".into())),
    );
    let (secondary, _) = ScriptedNarrator::boxed(
        NarrativeTier::Secondary,
        Behavior::Reply("Several risk indicators were found."),
    );
    let generator = NarrativeGenerator::new(vec![rich, secondary], Duration::from_secs(1));

    let assessment = assessment();
    let narrative = generator
        .generate(&NarrativeRequest {
            assessment: &assessment,
            timeline: &[],
            identifiers: &[],
        })
        .await;

    assert_eq!(narrative.tier, NarrativeTier::Secondary);
    assert_eq!(narrative.recommendations, recommendations_for(Verdict::Scam));
}

#[tokio::test]
async fn test_all_tiers_failing_use_template() {
    let (rich, _) = ScriptedNarrator::boxed(NarrativeTier::Rich, Behavior::Hang);
    let (secondary, secondary_calls) =
        ScriptedNarrator::boxed(NarrativeTier::Secondary, Behavior::Fail(NarrativeError::EmptyResponse));
    let generator = NarrativeGenerator::new(vec![rich, secondary], Duration::from_millis(100));

    let assessment = assessment();
    let narrative = generator
        .generate(&NarrativeRequest {
            assessment: &assessment,
            timeline: &[],
            identifiers: &[],
        })
        .await;

    assert_eq!(narrative.tier, NarrativeTier::Template);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    assert!(narrative.summary.contains("SCAM"));
    assert!(narrative.summary.contains("72/100"));
    assert!(narrative.summary.contains("very new"));
    assert_eq!(narrative.recommendations, recommendations_for(Verdict::Scam));
}

#[tokio::test]
async fn test_recommendations_independent_of_tier() {
    let assessment = RiskAssessment {
        score: 10,
        verdict: Verdict::Safe,
        risk_factors: vec![],
    };
    let request = NarrativeRequest {
        assessment: &assessment,
        timeline: &[],
        identifiers: &[],
    };

    let (rich, _) = ScriptedNarrator::boxed(NarrativeTier::Rich, Behavior::Reply("Looks fine."));
    let from_rich = NarrativeGenerator::new(vec![rich], Duration::from_secs(1))
        .generate(&request)
        .await;
    let from_template = NarrativeGenerator::template_only().generate(&request).await;

    assert_ne!(from_rich.tier, from_template.tier);
    assert_eq!(from_rich.recommendations, from_template.recommendations);
}

#[tokio::test]
async fn test_unconfigured_generators_fall_back_to_template() {
    let generator =
        NarrativeGenerator::from_config(&relief_verify::config::NarrativeConfig::default())
            .unwrap();
    let assessment = assessment();
    let narrative = generator
        .generate(&NarrativeRequest {
            assessment: &assessment,
            timeline: &[],
            identifiers: &[],
        })
        .await;
    assert_eq!(narrative.tier, NarrativeTier::Template);
}
