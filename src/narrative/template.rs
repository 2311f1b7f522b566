use crate::scoring::RiskAssessment;

/// Deterministic summary built from the verdict and risk factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(&self, assessment: &RiskAssessment) -> String {
        let count = assessment.risk_factors.len();
        let factors = if count == 0 {
            "We identified no specific risk factors during our analysis.".to_string()
        } else {
            format!(
                "We identified {} risk factor(s) during our analysis: {}.",
                count,
                assessment.risk_factors.join("; ")
            )
        };

        format!(
            "Our investigation has determined this resource to be {} (risk score {}/100).\n\n\
             {} The verification process included checking domain registration details, \
             cross-referencing with scam databases, and verifying organization registrations.\n\n\
             Based on the evidence collected, we recommend exercising appropriate caution and \
             verifying through additional independent sources before proceeding.",
            assessment.verdict, assessment.score, factors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Verdict;

    #[test]
    fn test_render_lists_factors() {
        let assessment = RiskAssessment {
            score: 45,
            verdict: Verdict::Suspicious,
            risk_factors: vec![
                "Domain give.org is very new (3 days old)".into(),
                "Suspicious patterns found: +15550100".into(),
            ],
        };
        let text = TemplateNarrator.render(&assessment);
        assert!(text.contains("SUSPICIOUS"));
        assert!(text.contains("45/100"));
        assert!(text.contains("2 risk factor(s)"));
        assert!(text.contains("give.org is very new"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let assessment = RiskAssessment {
            score: 0,
            verdict: Verdict::Safe,
            risk_factors: vec![],
        };
        assert_eq!(
            TemplateNarrator.render(&assessment),
            TemplateNarrator.render(&assessment)
        );
        assert!(TemplateNarrator.render(&assessment).contains("no specific risk factors"));
    }
}
