use async_trait::async_trait;
use tracing::info;

use crate::traits::Notifier;

/// Notifier that surfaces user notices on the daemon log. The embedding
/// application can swap in its own `Notifier` (UI toast, chat reply) without
/// touching the pipeline.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) {
        info!(notice = true, "{}", text);
    }
}
