//! Secret file lifecycle action
//!
//! Setup writes the secret to disk and records where; teardown deletes it.
//! Unlike the emulator teardown, a failed delete is reported: a secret file
//! that is gone by cleanup time means something else touched it.

use std::path::Path;

use async_trait::async_trait;
use ci_lifecycle_core::{CiPlatform, LifecycleAction, LifecycleError};
use tracing::info;

use crate::secret::SecretType;
use crate::store::SecretFileLib;

pub const TYPE_INPUT: &str = "type";
pub const SECRET_INPUT: &str = "secret";
pub const FILE_PATH_INPUT: &str = "file_path";

/// Output and state key holding the materialized file's path
pub const FILE_PATH_KEY: &str = "file_path";

/// Secret file lifecycle action
pub struct SecretFileAction<F: SecretFileLib> {
    lib: F,
}

impl<F: SecretFileLib> SecretFileAction<F> {
    pub fn new(lib: F) -> Self {
        Self { lib }
    }

    pub fn lib(&self) -> &F {
        &self.lib
    }
}

#[async_trait]
impl<F: SecretFileLib> LifecycleAction for SecretFileAction<F> {
    fn name(&self) -> &'static str {
        "secret-file"
    }

    async fn setup(&self, platform: &dyn CiPlatform) -> anyhow::Result<()> {
        let secret_type: SecretType = platform.get_input(TYPE_INPUT, true)?.parse()?;
        let secret = platform.get_input(SECRET_INPUT, true)?;
        let requested = platform.get_input(FILE_PATH_INPUT, false)?;

        // Nothing may touch the disk until the secret decodes; an allocated
        // path that never reaches state could not be reclaimed.
        let contents = secret_type.decode(&secret)?;

        let path = self
            .lib
            .resolve_path(Some(requested.as_str()).filter(|p| !p.is_empty()))
            .await?;
        self.lib.write_secret(&contents, &path).await?;

        let path = path.to_string_lossy();
        platform.set_output(FILE_PATH_KEY, &path)?;
        platform.save_state(FILE_PATH_KEY, &path)?;

        info!(path = %path, secret_type = %secret_type, "secret file written");
        Ok(())
    }

    async fn teardown(&self, platform: &dyn CiPlatform) -> anyhow::Result<()> {
        let path = platform.get_state(FILE_PATH_KEY);
        if path.is_empty() {
            return Err(LifecycleError::MissingState(FILE_PATH_KEY.to_string()).into());
        }

        self.lib.remove(Path::new(&path)).await?;

        info!(path = %path, "secret file removed");
        Ok(())
    }
}
