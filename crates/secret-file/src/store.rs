//! Secret file storage
//!
//! Path allocation, writing and deletion of secret files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Secret file errors
#[derive(Debug, thiserror::Error)]
pub enum SecretFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tempfile::PersistError> for SecretFileError {
    fn from(err: tempfile::PersistError) -> Self {
        SecretFileError::Io(err.error)
    }
}

/// Capability for materializing and removing secret files
#[async_trait]
pub trait SecretFileLib: Send + Sync {
    /// The caller's path verbatim, or a freshly allocated unique temp file
    async fn resolve_path(&self, requested: Option<&str>) -> Result<PathBuf, SecretFileError>;

    /// Write already-decoded secret bytes to `path`, replacing any previous
    /// content
    async fn write_secret(&self, contents: &[u8], path: &Path) -> Result<(), SecretFileError>;

    /// Delete the file at `path`. A missing file is an error.
    async fn remove(&self, path: &Path) -> Result<(), SecretFileError>;
}

/// `SecretFileLib` on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsSecretFiles {
    temp_dir: Option<PathBuf>,
}

impl FsSecretFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate temp files under `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    fn allocate(&self) -> Result<PathBuf, SecretFileError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("secret-");

        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // Keep the file on disk past this process; teardown deletes it
        let (_, path) = file.keep()?;
        Ok(path)
    }
}

#[async_trait]
impl SecretFileLib for FsSecretFiles {
    async fn resolve_path(&self, requested: Option<&str>) -> Result<PathBuf, SecretFileError> {
        match requested {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => {
                let path = self.allocate()?;
                debug!("allocated secret file {}", path.display());
                Ok(path)
            }
        }
    }

    async fn write_secret(&self, contents: &[u8], path: &Path) -> Result<(), SecretFileError> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;

        debug!(path = %path.display(), bytes = contents.len(), "secret written");
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), SecretFileError> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}
