use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::OpenAiConfig;
use crate::traits::CompletionBackend;
use crate::types::CompletionOutcome;
use crate::utils::truncate_str;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Client for OpenAI-compatible `/v1/chat/completions` endpoints.
///
/// Every failure mode — missing key, transport fault, non-2xx status,
/// unparseable body, empty completion — comes back as
/// `CompletionOutcome::Failure`; nothing here returns an `Err`.
pub struct OpenAiClient {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
    /// Some compatible providers put the error text at the top level.
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

impl OpenAiClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        config: &OpenAiConfig,
        original_content: &str,
        message: &str,
    ) -> CompletionOutcome {
        if config.api_key.is_empty() {
            return CompletionOutcome::Failure {
                reason: "OpenAI API key is not set".to_string(),
            };
        }

        let prompt = render_prompt(&config.prompt_template, original_content, message);
        let url = format!(
            "{}/v1/chat/completions",
            config.host.trim_end_matches('/')
        );

        let body = json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": config.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });

        info!(model = %config.model, url = %url, "Calling completion API");

        let response = match self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", config.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return CompletionOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                return CompletionOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        };

        debug!(status, "Completion response: {}", truncate_str(&text, 2000));

        reduce_response(status, &text)
    }
}

/// Substitute the two named placeholders into the prompt template.
/// Only the first occurrence of each placeholder is replaced.
fn render_prompt(template: &str, original_content: &str, message: &str) -> String {
    template
        .replacen("{original_content}", original_content, 1)
        .replacen("{message}", message, 1)
}

/// Reduce a raw completion response to a `CompletionOutcome`.
///
/// The body is parsed before the status is checked so that non-2xx responses
/// can surface the server-declared error message instead of a bare code.
fn reduce_response(status: u16, body: &str) -> CompletionOutcome {
    let parsed: ChatCompletionResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => {
            return CompletionOutcome::Failure {
                reason: format!("Can not parse response: {}", truncate_str(body, 200)),
            }
        }
    };

    if !(200..300).contains(&status) {
        let reason = parsed
            .error
            .and_then(|e| e.message)
            .or(parsed.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return CompletionOutcome::Failure { reason };
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty());

    match content {
        Some(content) => CompletionOutcome::Success {
            content: content.trim().to_string(),
        },
        None => CompletionOutcome::Failure {
            reason: "Empty API response".to_string(),
        },
    }
}
