use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::prompt::{SYSTEM_INSTRUCTIONS, strip_markdown, user_prompt};
use super::{NarrativeRequest, NarrativeStrategy, NarrativeTier};
use crate::config::NarrativeConfig;
use crate::error::NarrativeError;

/// Secondary tier: any OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionNarrator {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionNarrator {
    pub fn new(client: Client, config: &NarrativeConfig) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: config.openai_endpoint.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl NarrativeStrategy for ChatCompletionNarrator {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn tier(&self) -> NarrativeTier {
        NarrativeTier::Secondary
    }

    async fn compose(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NarrativeError::Unavailable("no chat completions API key".to_string()))?;

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTIONS},
                {"role": "user", "content": user_prompt(&request.findings(), request.assessment)},
            ],
        });

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let summary = strip_markdown(&text);
        if summary.is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(summary)
    }
}
