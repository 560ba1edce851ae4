use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::traits::DocumentStore;

/// Filesystem-backed document store rooted at a single directory.
///
/// Paths are vault-relative with `/` separators, matching what the router
/// produces. Absolute paths and `..` segments are rejected so a hostile
/// folder setting cannot escape the root.
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            anyhow::bail!("path escapes the vault root: {}", path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FsVault {
    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await?)
    }

    async fn read(&self, path: &str) -> anyhow::Result<String> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&full).await?)
    }

    async fn create(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let full = self.resolve(path)?;
        // create_new so a concurrent writer can't be silently clobbered
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await?;
        file.write_all(content.as_bytes()).await?;
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> anyhow::Result<()> {
        let full = self.resolve(path)?;
        // no-op if the folder is already there
        tokio::fs::create_dir_all(&full).await?;
        Ok(())
    }
}
