use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const UPLOADS_DIR: &str = "uploads";

/// Image bytes on local disk, addressed by root-relative paths such as
/// `/uploads/3f0c...e1.png`.
#[derive(Clone, Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Writes `bytes` under a fresh random name and returns the stored path.
    pub async fn write(&self, bytes: &[u8], original_name: &str) -> AppResult<String> {
        let dir = self.uploads_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let target = dir.join(&file_name);

        let mut file = tokio::fs::File::create(&target).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(path = %target.display(), size = bytes.len(), "stored image");
        Ok(format!("/{UPLOADS_DIR}/{file_name}"))
    }

    /// Removes the file behind `stored`. Missing files and paths outside the
    /// store are a no-op; returns whether a file was removed.
    pub async fn delete(&self, stored: &str) -> AppResult<bool> {
        let Some(path) = self.resolve(stored) else {
            debug!(stored = %stored, "ignoring delete of unresolvable path");
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed image");
                Ok(true)
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn read(&self, stored: &str) -> AppResult<Vec<u8>> {
        let Some(path) = self.resolve(stored) else {
            return Err(AppError::not_found("File not found."));
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(AppError::not_found("File not found."))
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn exists(&self, stored: &str) -> bool {
        match self.resolve(stored) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Maps a stored path onto disk. Only plain names below `uploads/` resolve.
    fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored.trim_start_matches('/'));

        let mut components = relative.components();
        match components.next() {
            Some(Component::Normal(first)) if first == UPLOADS_DIR => {},
            _ => return None,
        }

        let mut rest = 0;
        for component in components {
            match component {
                Component::Normal(_) => rest += 1,
                _ => return None,
            }
        }
        if rest == 0 {
            return None;
        }

        Some(self.root.join(relative))
    }
}

/// `.png` for `poster.PNG`, empty when the extension is absent or odd.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
