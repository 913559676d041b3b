//! Local storage for downloaded images.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use url::Url;

use crate::config::MediaSettings;

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid media file name `{0}`")]
    InvalidFileName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Flat directory of saved images plus the base URL they are served from.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    public_base: Url,
}

impl MediaStorage {
    /// The directory is created on the first write, not here.
    pub fn new(root: PathBuf, public_base: Url) -> Self {
        Self { root, public_base }
    }

    pub fn from_settings(settings: &MediaSettings) -> Self {
        Self::new(
            settings.directory.clone(),
            settings.public_base_url.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` to `<root>/<file_name>` and return that path.
    ///
    /// A partially written file is removed before the error is returned.
    pub async fn persist(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, MediaStorageError> {
        let path = self.resolve(file_name)?;
        fs::create_dir_all(&self.root).await?;

        if let Err(err) = write_file(&path, data).await {
            let _ = fs::remove_file(&path).await;
            return Err(err.into());
        }
        Ok(path)
    }

    /// Public URL of a saved file.
    pub fn public_url(&self, file_name: &str) -> Result<Url, url::ParseError> {
        self.public_base.join(file_name)
    }

    /// Remove a saved file. Missing files are treated as success.
    pub async fn remove(&self, path: &Path) -> Result<(), MediaStorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaStorageError::Io(err)),
        }
    }

    fn resolve(&self, file_name: &str) -> Result<PathBuf, MediaStorageError> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(file_name)),
            _ => Err(MediaStorageError::InvalidFileName(file_name.to_string())),
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> MediaStorage {
        MediaStorage::new(
            dir.path().join("nested/topics"),
            Url::parse("http://localhost:8080/topics/").unwrap(),
        )
    }

    #[tokio::test]
    async fn persist_creates_directory_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert!(!storage.root().exists());

        let path = storage.persist("menu_1_0.png", b"png").await.unwrap();

        assert_eq!(path, storage.root().join("menu_1_0.png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn rejects_names_leaving_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        for name in ["../escape.png", "a/b.png", "/abs.png", ""] {
            assert!(matches!(
                storage.persist(name, b"png").await,
                Err(MediaStorageError::InvalidFileName(_))
            ));
        }
    }

    #[tokio::test]
    async fn remove_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let path = storage.persist("menu_1_0.png", b"png").await.unwrap();
        storage.remove(&path).await.unwrap();
        storage.remove(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn public_url_joins_below_base() {
        let dir = tempfile::tempdir().unwrap();
        let url = storage(&dir).public_url("宴会_1_0.png").unwrap();
        assert!(url.as_str().starts_with("http://localhost:8080/topics/"));
        assert!(url.as_str().ends_with("_1_0.png"));
    }
}
