use serde::Deserialize;

/// One inbound Telegram update as delivered by `getUpdates`.
///
/// Only the fields the bridge consumes are modeled; everything else in the
/// payload is ignored by serde.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl Update {
    /// Effective message text: `text` wins over `caption`. Updates carrying
    /// neither (stickers, service messages) yield `None` and are skipped.
    pub fn text(&self) -> Option<&str> {
        let message = self.message.as_ref()?;
        message
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| message.caption.as_deref().filter(|t| !t.is_empty()))
    }
}

/// Where a message goes and what part of it becomes the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    /// Sanitized, `.md`-suffixed file name (folder not yet applied).
    pub file_name: String,
    /// The note content handed to the completion call.
    pub message: String,
}

/// Result of one completion cycle, reduced at the provider boundary.
/// Expected failures (bad key, malformed body, non-2xx, empty response,
/// transport faults) are all `Failure` values — they never propagate as
/// errors past the completion client.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Success { content: String },
    Failure { reason: String },
}
