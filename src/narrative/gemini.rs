use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::prompt::{SYSTEM_INSTRUCTIONS, strip_markdown, user_prompt};
use super::{NarrativeRequest, NarrativeStrategy, NarrativeTier};
use crate::config::NarrativeConfig;
use crate::error::NarrativeError;

/// Rich tier: Gemini `generateContent`.
pub struct GeminiNarrator {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiNarrator {
    pub fn new(client: Client, config: &NarrativeConfig) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            endpoint: config.gemini_endpoint.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl NarrativeStrategy for GeminiNarrator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn tier(&self) -> NarrativeTier {
        NarrativeTier::Rich
    }

    async fn compose(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NarrativeError::Unavailable("no Gemini API key".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "systemInstruction": {"parts": [{"text": SYSTEM_INSTRUCTIONS}]},
            "contents": [{
                "role": "user",
                "parts": [{"text": user_prompt(&request.findings(), request.assessment)}],
            }],
            "generationConfig": {"maxOutputTokens": self.max_tokens},
        });

        let response: GenerateResponse = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let summary = strip_markdown(&text);
        if summary.is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(summary)
    }
}
