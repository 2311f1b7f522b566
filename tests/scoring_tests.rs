//! Scoring properties over hand-built timelines.

use relief_verify::case::{Identifier, IdentifierKind};
use relief_verify::config::ScoringWeights;
use relief_verify::evidence::{
    DomainAgeReport, EvidenceItem, EvidencePayload, ProviderKind, RegistryReport, RiskLevel,
    ScamMatch, ScamReport, VerificationStatus,
};
use relief_verify::scoring::{RiskRules, RiskScorer, Verdict, score};

fn rules() -> RiskRules {
    RiskRules::new(ScoringWeights::default())
}

fn domain(name: &str, age: i64) -> EvidenceItem {
    EvidenceItem::new(
        Identifier::domain(name),
        ProviderKind::DomainAge,
        EvidencePayload::DomainAge(DomainAgeReport {
            domain: name.to_string(),
            registered: true,
            age_days: Some(age),
            registrar: None,
            created_at: None,
        }),
        &rules(),
    )
}

fn scam(identifier: &str, level: RiskLevel) -> EvidenceItem {
    EvidenceItem::new(
        Identifier::phone(identifier),
        ProviderKind::ScamMatch,
        EvidencePayload::ScamMatch(ScamReport {
            identifier: identifier.to_string(),
            kind: IdentifierKind::Phone,
            risk_level: level,
            matches: vec![ScamMatch {
                pattern: identifier.to_string(),
                reason: "reported".to_string(),
                source_url: None,
            }],
            search_results: vec![],
        }),
        &rules(),
    )
}

fn unregistered(org: &str) -> EvidenceItem {
    EvidenceItem::new(
        Identifier::organization(org),
        ProviderKind::Registry,
        EvidencePayload::Registry(RegistryReport {
            organization: org.to_string(),
            registered: false,
            details: None,
            verification_status: VerificationStatus::Unverified,
            search_results: vec![],
        }),
        &rules(),
    )
}

#[test]
fn test_single_new_domain_is_safe() {
    let assessment = score(&[domain("give-now.org", 10)], false);
    assert_eq!(assessment.score, 30);
    assert_eq!(assessment.verdict, Verdict::Safe);
    assert_eq!(
        assessment.risk_factors,
        vec!["Domain give-now.org is very new (10 days old)"]
    );
}

#[test]
fn test_high_scam_and_unregistered_org_is_suspicious() {
    let assessment = score(
        &[unregistered("Hope Relief Trust"), scam("+15550100", RiskLevel::High)],
        false,
    );
    assert_eq!(assessment.score, 65);
    assert_eq!(assessment.verdict, Verdict::Suspicious);
    // Scam factors are reported before registry factors whatever the timeline order.
    assert!(assessment.risk_factors[0].starts_with("High risk match"));
    assert!(assessment.risk_factors[1].starts_with("Organization not found"));
}

#[test]
fn test_score_clamps_to_max() {
    let timeline = vec![
        domain("a.org", 1),
        domain("b.org", 2),
        domain("c.org", 3),
        scam("+15550100", RiskLevel::High),
        unregistered("Fake Aid"),
    ];
    let assessment = score(&timeline, false);
    assert_eq!(assessment.score, 100);
    assert_eq!(assessment.verdict, Verdict::Scam);
    assert_eq!(assessment.risk_factors.len(), 5);
}

#[test]
fn test_verdict_boundaries() {
    assert_eq!(Verdict::from_score(0), Verdict::Safe);
    assert_eq!(Verdict::from_score(39), Verdict::Safe);
    assert_eq!(Verdict::from_score(40), Verdict::Suspicious);
    assert_eq!(Verdict::from_score(69), Verdict::Suspicious);
    assert_eq!(Verdict::from_score(70), Verdict::Scam);
    assert_eq!(Verdict::from_score(100), Verdict::Scam);
}

#[test]
fn test_no_data_is_at_least_suspicious() {
    let assessment = score(&[], true);
    assert!(assessment.score >= 50);
    assert!(assessment.verdict >= Verdict::Suspicious);
    assert!(assessment.risk_factors[0].contains("No identifiers extracted"));
}

#[test]
fn test_empty_timeline_with_identifiers_is_safe() {
    let assessment = score(&[], false);
    assert_eq!(assessment.score, 0);
    assert_eq!(assessment.verdict, Verdict::Safe);
    assert!(assessment.risk_factors.is_empty());
}

#[test]
fn test_deterministic_for_same_timeline() {
    let timeline = vec![
        scam("+15550100", RiskLevel::Low),
        domain("give-now.org", 100),
        unregistered("Hope"),
    ];
    let first = score(&timeline, false);
    for _ in 0..10 {
        assert_eq!(score(&timeline, false), first);
    }
    assert_eq!(first.score, 20 + 15 + 25);
}

#[test]
fn test_inconclusive_items_add_nothing() {
    let timeline = vec![
        EvidenceItem::inconclusive(
            Identifier::domain("give-now.org"),
            ProviderKind::DomainAge,
            "domain-age timed out after 100ms",
        ),
        EvidenceItem::inconclusive(
            Identifier::phone("+15550100"),
            ProviderKind::ScamMatch,
            "Network error: connection reset",
        ),
    ];
    assert_eq!(score(&timeline, false).score, 0);
}

#[test]
fn test_custom_weights() {
    let weights = ScoringWeights {
        very_new_domain: 45,
        ..ScoringWeights::default()
    };
    let scorer = RiskScorer::new(weights);
    let assessment = scorer.score(&[domain("give-now.org", 3)], false);
    assert_eq!(assessment.score, 45);
    assert_eq!(assessment.verdict, Verdict::Suspicious);
}

#[test]
fn test_oversized_weights_saturate_at_max_score() {
    let weights = ScoringWeights {
        scam_high: u32::MAX / 2 + 20,
        ..ScoringWeights::default()
    };
    let scorer = RiskScorer::new(weights);
    let assessment = scorer.score(
        &[
            scam("+15550100", RiskLevel::High),
            scam("+15550101", RiskLevel::High),
        ],
        false,
    );
    assert_eq!(assessment.score, 100);
    assert_eq!(assessment.verdict, Verdict::Scam);
}

#[test]
fn test_weights_above_max_score_rejected() {
    let mut config = relief_verify::config::EngineConfig::default();
    config.scoring.scam_high = u32::MAX / 2 + 20;
    config.scoring.no_data = 101;

    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("scoring.scam_high"));
    assert!(err.contains("scoring.no_data"));

    config.scoring.scam_high = 100;
    config.scoring.no_data = 100;
    assert!(config.validate().is_ok());
}
