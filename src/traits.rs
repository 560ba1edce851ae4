use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{OpenAiConfig, TelegramConfig};
use crate::telegram::PollError;
use crate::types::{CompletionOutcome, Update};

/// Capability over the document store the bridge writes into.
///
/// Paths are vault-relative, `/`-separated. `create_folder` must be
/// idempotent; callers apply it per path segment.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, path: &str) -> anyhow::Result<bool>;
    async fn read(&self, path: &str) -> anyhow::Result<String>;
    async fn create(&self, path: &str, content: &str) -> anyhow::Result<()>;
    async fn modify(&self, path: &str, content: &str) -> anyhow::Result<()>;
    async fn create_folder(&self, path: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget user-facing notices. No delivery guarantees, no results —
/// the worst observable effect of any failure is a skipped notice.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// One request/response cycle against a completion endpoint, reduced to a
/// `CompletionOutcome` at this boundary. Implementations must not return
/// transport or parse faults as errors.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        config: &OpenAiConfig,
        original_content: &str,
        message: &str,
    ) -> CompletionOutcome;
}

/// One long-poll cycle against the messaging API.
///
/// `offset` is `cursor + 1`; the call must abort promptly when `cancel` fires
/// and report that as `PollError::Cancelled`.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn poll(
        &self,
        config: &TelegramConfig,
        offset: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Update>, PollError>;
}
