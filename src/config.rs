use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    /// Filesystem root the document store operates under.
    #[serde(default = "default_vault_root")]
    pub root: String,
    /// Folder inside the vault where notes land (empty = vault root).
    #[serde(default = "default_save_folder")]
    pub folder: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_vault_root(),
            folder: default_save_folder(),
        }
    }
}

fn default_vault_root() -> String {
    "vault".to_string()
}
fn default_save_folder() -> String {
    "Telegram".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Merge prompt. Placeholders `{original_content}` and `{message}` are
    /// substituted per call.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
    /// Completions shorter than this are treated as suspected garbage and
    /// never written to the vault.
    #[serde(default = "default_min_response_length")]
    pub min_response_length: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            host: default_host(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            prompt_template: default_prompt_template(),
            min_response_length: default_min_response_length(),
        }
    }
}

fn default_host() -> String {
    "https://api.openai.com".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_min_response_length() -> usize {
    100
}

fn default_system_prompt() -> String {
    "You are note-taking helper for personal knowledge base.".to_string()
}

fn default_prompt_template() -> String {
    "Merge these notes into a well-structured markdown document.\n\
     Preserve all information, remove duplicates, organize logically. Follow author's language.\n\
     \n\
     Existing notes:\n\
     {original_content}\n\
     \n\
     New notes:\n\
     {message}\n"
        .to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Shared handle to the live configuration.
///
/// Every operation takes a `snapshot()` at its start and works on that copy,
/// so a settings change applies on the next poll iteration or the next routed
/// message — never retroactively to work already in flight.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub async fn snapshot(&self) -> AppConfig {
        self.inner.read().await.clone()
    }

    /// Replace the live config (settings-change hook).
    pub async fn replace(&self, config: AppConfig) {
        *self.inner.write().await = config;
    }
}
