use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ConfigHandle;
use crate::router::MessageRouter;
use crate::telegram::PollError;
use crate::traits::{Notifier, UpdateSource};

/// Retry delays per outcome class. Injectable so tests run without waiting.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Transport-level poll failure.
    pub transport: Duration,
    /// Another consumer holds the long-poll slot (409).
    pub conflict: Duration,
    /// Telegram reported `ok: false` for any other reason.
    pub api_error: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            transport: Duration::from_secs(5),
            conflict: Duration::from_secs(5),
            api_error: Duration::from_secs(10),
        }
    }
}

/// Mutable lifecycle state shared between the controller and the loop task.
///
/// One instance per controller — nothing here is ambient, so independent
/// bridges (and tests) never interfere with each other.
pub struct PollerState {
    active: AtomicBool,
    /// ID of the last update handed to the router. Advances when an update is
    /// taken from a batch, deliberately before routing completes: a message
    /// whose AI step fails for content reasons must not be reprocessed.
    cursor: AtomicI64,
    /// Token tied to the in-flight long-poll call; replaced each iteration.
    cancel: Mutex<CancellationToken>,
}

impl PollerState {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            cursor: AtomicI64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flip to active. Returns false when the loop was already running.
    pub fn activate(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    /// Clear the active flag and cancel whatever call is in flight.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.current_token().cancel();
    }

    pub fn cursor(&self) -> i64 {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn set_cursor(&self, id: i64) {
        self.cursor.store(id, Ordering::SeqCst);
    }

    pub fn reset_cursor(&self) {
        self.cursor.store(0, Ordering::SeqCst);
    }

    /// Install and return a fresh token for the next call.
    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut guard = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = token.clone();
        token
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new()
    }
}

/// The long-poll state machine: one in-flight `getUpdates` call at a time,
/// strict sequential routing, classified backoff on failure.
pub struct PollLoop {
    state: Arc<PollerState>,
    source: Arc<dyn UpdateSource>,
    router: Arc<MessageRouter>,
    notifier: Arc<dyn Notifier>,
    config: ConfigHandle,
    backoff: BackoffPolicy,
}

impl PollLoop {
    pub fn new(
        state: Arc<PollerState>,
        source: Arc<dyn UpdateSource>,
        router: Arc<MessageRouter>,
        notifier: Arc<dyn Notifier>,
        config: ConfigHandle,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            state,
            source,
            router,
            notifier,
            config,
            backoff,
        }
    }

    pub async fn run(self) {
        while self.state.is_active() {
            let cancel = self.state.arm();
            // stop() may have raced with arming; its cancel landed on the old
            // token, so the flag is the authority here.
            if !self.state.is_active() {
                break;
            }

            let config = self.config.snapshot().await;
            let offset = self.state.cursor() + 1;

            match self.source.poll(&config.telegram, offset, &cancel).await {
                Err(PollError::Cancelled) => {
                    debug!("Poll cancelled, exiting loop");
                    break;
                }
                Err(PollError::Conflict) => {
                    warn!("Poll conflict detected, waiting before retry");
                    self.notifier
                        .notify("Connection conflict detected, reconnecting...")
                        .await;
                    if !self.backoff_sleep(self.backoff.conflict, &cancel).await {
                        break;
                    }
                }
                Err(PollError::Api { description }) => {
                    warn!(%description, "Telegram API error");
                    self.notifier
                        .notify(&format!("Telegram bot got error: {}", description))
                        .await;
                    if !self.backoff_sleep(self.backoff.api_error, &cancel).await {
                        break;
                    }
                }
                Err(PollError::Network(e)) => {
                    error!(error = %e, "Telegram polling error");
                    if !self.state.is_active() {
                        break;
                    }
                    if !self.backoff_sleep(self.backoff.transport, &cancel).await {
                        break;
                    }
                }
                Ok(updates) => {
                    // The flag may have been cleared while we awaited.
                    if !self.state.is_active() {
                        break;
                    }
                    for update in updates {
                        self.state.set_cursor(update.update_id);
                        if !self.state.is_active() {
                            break;
                        }
                        if let Some(text) = update.text() {
                            self.router.process_message(&config, text).await;
                        }
                    }
                }
            }
        }
        info!("Polling loop ended");
    }

    /// Cancellable backoff. Returns false when stop() fired during the wait.
    async fn backoff_sleep(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => self.state.is_active(),
        }
    }
}
