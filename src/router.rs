use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::traits::{CompletionBackend, DocumentStore, Notifier};
use crate::types::{CompletionOutcome, RoutingDecision};

/// First lines at or above this length are treated as having no title.
const MAX_TITLE_CHARS: usize = 100;
const NOTE_EXTENSION: &str = ".md";

/// Replace filesystem-hostile characters with `-`, collapse whitespace runs
/// to a single space, and trim the edges. Idempotent.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn timestamp_file_name(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Classify a message into a target file name and prompt content.
///
/// A short first line becomes the title and the rest becomes the content; a
/// single-line message doubles as both. A long first line means "no title",
/// so the note gets a timestamp name and the full text is the content.
pub fn route(text: &str, now: DateTime<Local>) -> RoutingDecision {
    let first_line = text.split('\n').next().unwrap_or("").trim();

    let (mut file_name, message) = if first_line.chars().count() < MAX_TITLE_CHARS {
        let remainder = text
            .split_once('\n')
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");
        let message = if remainder.is_empty() {
            first_line.to_string()
        } else {
            remainder.to_string()
        };
        (sanitize_file_name(first_line), message)
    } else {
        (timestamp_file_name(now), text.to_string())
    };

    if !file_name.ends_with(NOTE_EXTENSION) {
        file_name.push_str(NOTE_EXTENSION);
    }

    RoutingDecision { file_name, message }
}

/// Routes one message through the read → complete → validate → commit
/// sequence. Every failure is converted to a user notice at this boundary;
/// nothing escapes to the poll loop.
pub struct MessageRouter {
    store: Arc<dyn DocumentStore>,
    completion: Arc<dyn CompletionBackend>,
    notifier: Arc<dyn Notifier>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        completion: Arc<dyn CompletionBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            completion,
            notifier,
        }
    }

    pub async fn process_message(&self, config: &AppConfig, text: &str) {
        let decision = route(text, Local::now());
        let folder = config.vault.folder.trim();
        let full_path = if folder.is_empty() {
            decision.file_name.clone()
        } else {
            format!("{}/{}", folder, decision.file_name)
        };

        if let Err(e) = self.commit(config, &decision, folder, &full_path).await {
            error!(path = %full_path, error = %e, "Message processing failed");
            self.notifier.notify(&format!("Error: {}", e)).await;
        }
    }

    async fn commit(
        &self,
        config: &AppConfig,
        decision: &RoutingDecision,
        folder: &str,
        full_path: &str,
    ) -> anyhow::Result<()> {
        if !folder.is_empty() {
            self.ensure_folder(folder).await?;
        }

        let existed = self.store.exists(full_path).await?;
        let original_content = if existed {
            self.store.read(full_path).await?
        } else {
            String::new()
        };

        self.notifier.notify("AI running...").await;

        let outcome = self
            .completion
            .complete(&config.openai, &original_content, &decision.message)
            .await;

        match outcome {
            CompletionOutcome::Failure { reason } => {
                warn!(%reason, "Completion failed");
                self.notifier.notify(&format!("AI error! {}", reason)).await;
            }
            CompletionOutcome::Success { content } => {
                let length = content.chars().count();
                if length < config.openai.min_response_length {
                    // Safety valve: a suspiciously short completion must never
                    // overwrite good data.
                    warn!(length, path = %full_path, "Completion below minimum length, not committing");
                    self.notifier
                        .notify(&format!(
                            "AI's response is too short ({} symbols). I suppose it's some error, file not changed.",
                            length
                        ))
                        .await;
                    return Ok(());
                }

                if existed {
                    self.store.modify(full_path, &content).await?;
                    self.notifier
                        .notify(&format!("File updated - {}", decision.file_name))
                        .await;
                } else {
                    self.store.create(full_path, &content).await?;
                    self.notifier
                        .notify(&format!("File created - {}", decision.file_name))
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Create the save folder segment by segment, skipping segments that
    /// already exist.
    async fn ensure_folder(&self, folder: &str) -> anyhow::Result<()> {
        let mut current = String::new();
        for segment in folder.split('/').filter(|s| !s.is_empty()) {
            if current.is_empty() {
                current.push_str(segment);
            } else {
                current = format!("{}/{}", current, segment);
            }
            if !self.store.exists(&current).await? {
                self.store.create_folder(&current).await?;
            }
        }
        Ok(())
    }
}
