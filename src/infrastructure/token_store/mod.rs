use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

use crate::{domain::models::StoredToken, infrastructure::config::TokenConfig};

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>>;
    async fn save(&self, token: &StoredToken) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

pub fn build_token_store(config: &TokenConfig) -> anyhow::Result<Arc<dyn TokenStore>> {
    match config.provider.as_str() {
        "file" => Ok(Arc::new(FileTokenStore::new(PathBuf::from(&config.path)))),
        "memory" => Ok(Arc::new(MemoryTokenStore::default())),
        other => anyhow::bail!("unsupported token provider: {other}"),
    }
}

/// One JSON document on disk, cached after the first read.
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<StoredToken>>,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "access_token.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>> {
        let cached = self.cached.read().clone();
        if let Some(token) = cached {
            return Ok(Some(token));
        }
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let raw = fs::read(&self.path).await?;
        let token: StoredToken = serde_json::from_slice(&raw)?;
        *self.cached.write() = Some(token.clone());
        Ok(Some(token))
    }

    async fn save(&self, token: &StoredToken) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let staging = self.staging_path();
        let body = serde_json::to_vec_pretty(token)?;

        // A leftover staging file would keep its old mode; start fresh.
        if fs::try_exists(&staging).await? {
            fs::remove_file(&staging).await?;
        }
        if let Err(err) = write_staged(&staging, &body, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = ?cleanup, path = %staging.display(), "failed to remove staging file");
                }
            }
            return Err(err);
        }

        *self.cached.write() = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.cached.write() = None;
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

/// Writes the token readable by the owner only, then moves it into place.
async fn write_staged(staging: &Path, body: &[u8], target: &Path) -> anyhow::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(staging).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(staging, target).await?;
    Ok(())
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<StoredToken>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>> {
        Ok(self.token.read().clone())
    }

    async fn save(&self, token: &StoredToken) -> anyhow::Result<()> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.token.write().take();
        Ok(())
    }
}
