mod config;
mod controller;
mod notify;
mod poller;
mod providers;
mod router;
mod telegram;
mod traits;
mod types;
mod utils;
mod vault;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigHandle};
use crate::controller::BotController;
use crate::notify::LogNotifier;
use crate::poller::BackoffPolicy;
use crate::providers::OpenAiClient;
use crate::router::MessageRouter;
use crate::telegram::TelegramClient;
use crate::vault::FsVault;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = AppConfig::load(&config_path)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(FsVault::new(config.vault.root.clone()));
    let completion = Arc::new(OpenAiClient::new()?);
    let notifier = Arc::new(LogNotifier);
    let source = Arc::new(TelegramClient::new()?);

    let router = Arc::new(MessageRouter::new(
        store,
        completion,
        notifier.clone(),
    ));
    let controller = BotController::new(
        source,
        router,
        notifier,
        ConfigHandle::new(config),
        BackoffPolicy::default(),
    );

    controller.start().await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    controller.stop().await;

    Ok(())
}
