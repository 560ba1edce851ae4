use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::TelegramConfig;
use crate::traits::UpdateSource;
use crate::types::Update;
use crate::utils::truncate_str;

/// Server-side long-poll wait passed to `getUpdates`.
const LONG_POLL_SECS: u64 = 30;
/// Transport timeout; must comfortably exceed the server-side wait.
const REQUEST_TIMEOUT_SECS: u64 = 90;

/// Classified outcome of a failed poll cycle — tells the loop *why* the call
/// failed so it can pick the right backoff and notice.
#[derive(Debug, Clone, PartialEq)]
pub enum PollError {
    /// The in-flight call was aborted by `stop()`. Expected shutdown path.
    Cancelled,
    /// DNS, timeout, connection reset, unparseable body.
    Network(String),
    /// `error_code == 409`: another consumer holds the long-poll slot for
    /// this bot token.
    Conflict,
    /// `ok: false` with any other error; carries the server's description.
    Api { description: String },
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Cancelled => write!(f, "poll cancelled"),
            PollError::Network(e) => write!(f, "network error: {}", e),
            PollError::Conflict => write!(f, "conflict: another poller holds this token"),
            PollError::Api { description } => write!(f, "telegram API error: {}", description),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Thin client for the Telegram Bot API `getUpdates` endpoint.
pub struct TelegramClient {
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn poll(
        &self,
        config: &TelegramConfig,
        offset: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Update>, PollError> {
        let url = format!(
            "{}/bot{}/getUpdates?offset={}&timeout={}",
            config.api_base.trim_end_matches('/'),
            config.bot_token,
            offset,
            LONG_POLL_SECS,
        );

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = self.client.get(&url).send() => {
                result.map_err(|e| PollError::Network(e.to_string()))?
            }
        };

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = response.text() => {
                result.map_err(|e| PollError::Network(e.to_string()))?
            }
        };

        parse_poll_response(&body)
    }
}

/// Reduce a raw `getUpdates` body to updates or a classified error.
///
/// Telegram reports failures in-band (`ok: false` plus `error_code` and
/// `description`), so this never inspects the HTTP status.
fn parse_poll_response(body: &str) -> Result<Vec<Update>, PollError> {
    let response: GetUpdatesResponse = serde_json::from_str(body)
        .map_err(|_| PollError::Network(format!("unparseable poll response: {}", truncate_str(body, 200))))?;

    if !response.ok {
        if response.error_code == Some(409) {
            return Err(PollError::Conflict);
        }
        return Err(PollError::Api {
            description: response
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    Ok(response.result)
}
