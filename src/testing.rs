//! Test infrastructure: in-memory store, scripted completion backend,
//! scripted update source, and a recording notifier.
//!
//! Everything here is deterministic so the pipeline tests can run without a
//! network or a filesystem.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, TelegramConfig};
use crate::telegram::PollError;
use crate::traits::{CompletionBackend, DocumentStore, Notifier, UpdateSource};
use crate::types::{CompletionOutcome, IncomingMessage, Update};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory document store that records every mutation.
pub struct MemoryStore {
    files: Mutex<HashMap<String, String>>,
    folders: Mutex<HashSet<String>>,
    created: Mutex<Vec<String>>,
    modified: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            folders: Mutex::new(HashSet::new()),
            created: Mutex::new(Vec::new()),
            modified: Mutex::new(Vec::new()),
        }
    }

    /// Seed a pre-existing document (not counted as a mutation).
    pub async fn seed(&self, path: &str, content: &str) {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
    }

    pub async fn content(&self, path: &str) -> Option<String> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn file_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn has_folder(&self, path: &str) -> bool {
        self.folders.lock().await.contains(path)
    }

    /// Total create + modify calls observed.
    pub async fn mutation_count(&self) -> usize {
        self.created.lock().await.len() + self.modified.lock().await.len()
    }

    pub async fn created_paths(&self) -> Vec<String> {
        self.created.lock().await.clone()
    }

    pub async fn modified_paths(&self) -> Vec<String> {
        self.modified.lock().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().await.contains_key(path)
            || self.folders.lock().await.contains(path))
    }

    async fn read(&self, path: &str) -> anyhow::Result<String> {
        self.files
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such document: {}", path))
    }

    async fn create(&self, path: &str, content: &str) -> anyhow::Result<()> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
        self.created.lock().await.push(path.to_string());
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> anyhow::Result<()> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
        self.modified.lock().await.push(path.to_string());
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> anyhow::Result<()> {
        self.folders.lock().await.insert(path.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockCompletion
// ---------------------------------------------------------------------------

/// A recorded call to `MockCompletion::complete()`.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub original_content: String,
    pub message: String,
}

/// Completion backend with a FIFO queue of scripted outcomes. When the queue
/// is empty it returns a success comfortably above the default length gate.
pub struct MockCompletion {
    outcomes: Mutex<Vec<CompletionOutcome>>,
    pub calls: Mutex<Vec<CompletionCall>>,
}

impl MockCompletion {
    pub fn with_outcomes(outcomes: Vec<CompletionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A success payload longer than the default `min_response_length`.
    pub fn long_content() -> String {
        "merged note content ".repeat(10).trim().to_string()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn call(&self, index: usize) -> CompletionCall {
        self.calls.lock().await[index].clone()
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    async fn complete(
        &self,
        _config: &crate::config::OpenAiConfig,
        original_content: &str,
        message: &str,
    ) -> CompletionOutcome {
        self.calls.lock().await.push(CompletionCall {
            original_content: original_content.to_string(),
            message: message.to_string(),
        });

        let mut outcomes = self.outcomes.lock().await;
        if outcomes.is_empty() {
            CompletionOutcome::Success {
                content: Self::long_content(),
            }
        } else {
            outcomes.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
        }
    }

    pub async fn contains(&self, fragment: &str) -> bool {
        self.notices
            .lock()
            .await
            .iter()
            .any(|n| n.contains(fragment))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.notices.lock().await.push(text.to_string());
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Update source with a FIFO script of poll results. Once the script runs
/// out it parks until the cancellation token fires, mimicking a long poll
/// with no traffic.
pub struct ScriptedSource {
    script: Mutex<Vec<Result<Vec<Update>, PollError>>>,
    offsets: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Update>, PollError>>) -> Self {
        Self {
            script: Mutex::new(script),
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// Offsets of every poll call observed so far.
    pub async fn offsets(&self) -> Vec<i64> {
        self.offsets.lock().await.clone()
    }

    pub async fn poll_count(&self) -> usize {
        self.offsets.lock().await.len()
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn poll(
        &self,
        _config: &TelegramConfig,
        offset: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Update>, PollError> {
        self.offsets.lock().await.push(offset);

        let next = {
            let mut script = self.script.lock().await;
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match next {
            Some(result) => result,
            None => {
                cancel.cancelled().await;
                Err(PollError::Cancelled)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn text_update(id: i64, text: &str) -> Update {
    Update {
        update_id: id,
        message: Some(IncomingMessage {
            text: Some(text.to_string()),
            caption: None,
        }),
    }
}

pub fn bare_update(id: i64) -> Update {
    Update {
        update_id: id,
        message: None,
    }
}

/// A config with a token set so `start()` proceeds; everything else default.
pub fn test_config() -> AppConfig {
    let mut config: AppConfig = toml::from_str("").expect("empty config parses");
    config.telegram.bot_token = "123456:test-token".to_string();
    config
}

/// Poll an async condition every 10ms until it holds, panicking after 5s.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5s");
}
