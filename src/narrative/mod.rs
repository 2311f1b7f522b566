//! Narrative generation with tiered fallback.
//!
//! Strategies are tried in order; the template tier always succeeds.
//! Recommendations depend only on the verdict, never on the tier.

mod chat;
mod gemini;
mod prompt;
mod template;

pub use chat::ChatCompletionNarrator;
pub use gemini::GeminiNarrator;
pub use prompt::{Findings, strip_markdown};
pub use template::TemplateNarrator;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::case::Identifier;
use crate::config::NarrativeConfig;
use crate::error::{EngineError, NarrativeError, Result};
use crate::evidence::EvidenceItem;
use crate::scoring::{RiskAssessment, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeTier {
    Rich,
    Secondary,
    Template,
}

impl NarrativeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rich => "rich",
            Self::Secondary => "secondary",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for NarrativeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub tier: NarrativeTier,
}

#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub assessment: &'a RiskAssessment,
    pub timeline: &'a [EvidenceItem],
    pub identifiers: &'a [Identifier],
}

impl NarrativeRequest<'_> {
    pub fn findings(&self) -> Findings {
        Findings::collect(self.timeline, self.identifiers)
    }
}

#[async_trait]
pub trait NarrativeStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn tier(&self) -> NarrativeTier;

    async fn compose(
        &self,
        request: &NarrativeRequest<'_>,
    ) -> std::result::Result<String, NarrativeError>;
}

pub fn recommendations_for(verdict: Verdict) -> Vec<String> {
    let items: &[&str] = match verdict {
        Verdict::Scam => &[
            "DO NOT proceed with this resource",
            "Report to local authorities if you've already engaged",
            "Share this verification result with others in your community",
            "Use official disaster relief channels instead",
        ],
        Verdict::Suspicious => &[
            "Exercise extreme caution",
            "Verify through multiple independent sources",
            "Check official disaster relief registries",
            "Ask for references or credentials",
            "Consider using established relief organizations instead",
        ],
        Verdict::Safe => &[
            "Resource appears legitimate, but always verify independently",
            "Cross-check with official sources when possible",
            "Be cautious with personal information sharing",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

pub struct NarrativeGenerator {
    strategies: Vec<Box<dyn NarrativeStrategy>>,
    template: TemplateNarrator,
    timeout: Duration,
}

impl NarrativeGenerator {
    pub fn new(strategies: Vec<Box<dyn NarrativeStrategy>>, timeout: Duration) -> Self {
        Self {
            strategies,
            template: TemplateNarrator,
            timeout,
        }
    }

    /// Template-only generator.
    pub fn template_only() -> Self {
        Self::new(Vec::new(), Duration::from_secs(1))
    }

    /// Gemini first, then an OpenAI-compatible chat endpoint.
    pub fn from_config(config: &NarrativeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let strategies: Vec<Box<dyn NarrativeStrategy>> = vec![
            Box::new(GeminiNarrator::new(client.clone(), config)),
            Box::new(ChatCompletionNarrator::new(client, config)),
        ];
        Ok(Self::new(strategies, config.request_timeout()))
    }

    pub async fn generate(&self, request: &NarrativeRequest<'_>) -> Narrative {
        let verdict = request.assessment.verdict;

        for strategy in &self.strategies {
            let outcome = tokio::time::timeout(self.timeout, strategy.compose(request)).await;
            match outcome {
                Ok(Ok(summary)) => {
                    debug!(strategy = strategy.name(), "Narrative composed");
                    return Narrative {
                        summary,
                        recommendations: recommendations_for(verdict),
                        tier: strategy.tier(),
                    };
                }
                Ok(Err(NarrativeError::Unavailable(reason))) => {
                    debug!(strategy = strategy.name(), %reason, "Narrative tier skipped");
                }
                Ok(Err(e)) => {
                    warn!(strategy = strategy.name(), error = %e, "Narrative tier failed");
                }
                Err(_) => {
                    warn!(
                        strategy = strategy.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Narrative tier timed out"
                    );
                }
            }
        }

        Narrative {
            summary: self.template.render(request.assessment),
            recommendations: recommendations_for(verdict),
            tier: NarrativeTier::Template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_keyed_by_verdict() {
        assert!(recommendations_for(Verdict::Scam)[0].starts_with("DO NOT"));
        assert_eq!(recommendations_for(Verdict::Suspicious).len(), 5);
        assert!(recommendations_for(Verdict::Safe)[0].contains("verify independently"));
    }

    #[tokio::test]
    async fn test_template_only_generator() {
        let assessment = RiskAssessment {
            score: 75,
            verdict: Verdict::Scam,
            risk_factors: vec!["High risk match in scam database: +15550100".into()],
        };
        let request = NarrativeRequest {
            assessment: &assessment,
            timeline: &[],
            identifiers: &[],
        };

        let narrative = NarrativeGenerator::template_only().generate(&request).await;
        assert_eq!(narrative.tier, NarrativeTier::Template);
        assert!(narrative.summary.contains("SCAM"));
        assert_eq!(narrative.recommendations, recommendations_for(Verdict::Scam));
    }
}
