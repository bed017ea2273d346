use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{repositories::images::ImageStorage, value_objects::images::is_png};

#[derive(Debug, Clone)]
pub struct LocalImageStorageConfig {
    pub root_dir: PathBuf,
    pub max_bytes: usize,
}

/// Keeps uploaded images as `<uuid>.png` files inside one directory.
pub struct LocalImageStorage {
    root_dir: PathBuf,
    max_bytes: usize,
}

impl LocalImageStorage {
    pub async fn new(config: LocalImageStorageConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.root_dir)
            .await
            .with_context(|| format!("failed to create image dir {}", config.root_dir.display()))?;

        Ok(Self {
            root_dir: config.root_dir,
            max_bytes: config.max_bytes,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn path_for(&self, image_id: Uuid) -> PathBuf {
        self.root_dir.join(format!("{image_id}.png"))
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn save(&self, bytes: Vec<u8>) -> Result<Uuid> {
        if bytes.len() > self.max_bytes {
            bail!("image exceeds {} bytes", self.max_bytes);
        }
        if !is_png(&bytes) {
            bail!("image is not a PNG");
        }

        let image_id = Uuid::new_v4();
        let path = self.path_for(image_id);

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write image {}", path.display()))?;

        debug!(%image_id, size = bytes.len(), "images: stored upload");
        Ok(image_id)
    }

    async fn load(&self, image_id: Uuid) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(image_id);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read image {}", path.display()))
            }
        }
    }
}
