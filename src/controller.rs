use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigHandle};
use crate::poller::{BackoffPolicy, PollLoop, PollerState};
use crate::router::MessageRouter;
use crate::traits::{Notifier, UpdateSource};

/// Delay between stop and start on restart, giving the aborted long-poll
/// call time to unwind before a new one is issued.
const RESTART_SETTLE: Duration = Duration::from_secs(1);

/// Lifecycle facade over the poll loop: start/stop/restart plus the
/// settings-change hook. Owns the `PollerState` the loop runs against.
pub struct BotController {
    state: Arc<PollerState>,
    source: Arc<dyn UpdateSource>,
    router: Arc<MessageRouter>,
    notifier: Arc<dyn Notifier>,
    config: ConfigHandle,
    backoff: BackoffPolicy,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BotController {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        router: Arc<MessageRouter>,
        notifier: Arc<dyn Notifier>,
        config: ConfigHandle,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            state: Arc::new(PollerState::new()),
            source,
            router,
            notifier,
            config,
            backoff,
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Launch the poll loop as a background task. No-op (with a notice or a
    /// warning) when no bot token is configured or a loop is already active.
    pub async fn start(&self) {
        let config = self.config.snapshot().await;
        if config.telegram.bot_token.is_empty() {
            self.notifier.notify("Telegram bot token is not set").await;
            return;
        }

        if !self.state.activate() {
            warn!("Bot already running, skipping start");
            return;
        }

        let poll_loop = PollLoop::new(
            Arc::clone(&self.state),
            Arc::clone(&self.source),
            Arc::clone(&self.router),
            Arc::clone(&self.notifier),
            self.config.clone(),
            self.backoff,
        );

        let task = tokio::spawn(poll_loop.run());
        *self.handle.lock().await = Some(task);

        info!("Telegram bot started");
        self.notifier.notify("Telegram bot is online").await;
    }

    /// Clear the active flag, cancel the in-flight call, and wait for the
    /// loop task to finish. Safe to call when not running.
    pub async fn stop(&self) {
        self.state.deactivate();
        if let Some(task) = self.handle.lock().await.take() {
            let _ = task.await;
        }
    }

    /// Stop, let the aborted call unwind, reset the cursor, start again.
    pub async fn restart(&self) {
        self.stop().await;
        tokio::time::sleep(RESTART_SETTLE).await;
        self.state.reset_cursor();
        self.start().await;
    }

    /// Settings-change hook: swap in the new configuration and re-initialize
    /// the loop so credential changes take effect cleanly.
    pub async fn apply_config(&self, config: AppConfig) {
        self.config.replace(config).await;
        self.restart().await;
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[allow(dead_code)]
    pub fn cursor(&self) -> i64 {
        self.state.cursor()
    }
}
