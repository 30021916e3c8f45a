use std::path::{Component, Path, PathBuf};

use arbor_tree::{OutputsFileEntry, OutputsListing};
use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::{instrument, warn};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid outputs path '{path}'")]
    InvalidPath { path: String },

    #[error("Cannot read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot iterate directory '{path}': {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read metadata '{path}': {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a file '{path}'")]
    NotAFile { path: PathBuf },

    #[error("Cannot open file '{path}': {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where outputs listings and file contents come from.
///
/// Paths are relative to the outputs root; the empty path is the root.
#[async_trait]
pub trait OutputsSource: Send + Sync {
    async fn list(&self, path: &str) -> Result<OutputsListing, SourceError>;

    async fn read(&self, path: &str) -> Result<String, SourceError>;
}

/// Serves outputs from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    max_bytes: u64,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);
        let is_contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !is_contained {
            return Err(SourceError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl OutputsSource for LocalSource {
    #[instrument(skip(self))]
    async fn list(&self, path: &str) -> Result<OutputsListing, SourceError> {
        let dir = self.resolve(path)?;
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|source| SourceError::ReadDir {
                path: dir.clone(),
                source,
            })?;

        let mut listing = OutputsListing::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| SourceError::ReadDirEntry {
                path: dir.clone(),
                source,
            })?
        {
            let entry_path = entry.path();
            // Follows symlinks; dangling links are skipped.
            let metadata = match fs::metadata(&entry_path).await {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!(path = %entry_path.display(), %error, "Skipping unreadable entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if metadata.is_dir() {
                listing.dirs.push(name);
            } else {
                listing.files.push(OutputsFileEntry {
                    name,
                    size: metadata.len(),
                });
            }
        }

        listing.dirs.sort();
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<String, SourceError> {
        let file_path = self.resolve(path)?;
        let metadata = fs::metadata(&file_path)
            .await
            .map_err(|source| SourceError::Metadata {
                path: file_path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(SourceError::NotAFile { path: file_path });
        }

        let file = File::open(&file_path)
            .await
            .map_err(|source| SourceError::OpenFile {
                path: file_path.clone(),
                source,
            })?;
        let mut bytes = Vec::new();
        file.take(self.max_bytes)
            .read_to_end(&mut bytes)
            .await
            .map_err(|source| SourceError::ReadFile {
                path: file_path.clone(),
                source,
            })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std_fs::create_dir_all(dir.path().join("logs/2024")).unwrap();
        std_fs::create_dir(dir.path().join("plots")).unwrap();
        std_fs::write(dir.path().join("model.pt"), b"weights").unwrap();
        std_fs::write(dir.path().join("logs/run.log"), b"epoch 1\nepoch 2\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn list_root_splits_dirs_and_files() {
        let dir = fixture();
        let source = LocalSource::new(dir.path(), 1024);

        let listing = source.list("").await.unwrap();

        assert_eq!(listing.dirs, ["logs", "plots"]);
        assert_eq!(
            listing.files,
            [OutputsFileEntry {
                name: "model.pt".into(),
                size: 7
            }]
        );
    }

    #[tokio::test]
    async fn list_nested_dir() {
        let dir = fixture();
        let source = LocalSource::new(dir.path(), 1024);

        let listing = source.list("logs").await.unwrap();

        assert_eq!(listing.dirs, ["2024"]);
        assert_eq!(listing.files[0].name, "run.log");
    }

    #[tokio::test]
    async fn list_missing_dir_fails() {
        let dir = fixture();
        let source = LocalSource::new(dir.path(), 1024);

        let error = source.list("missing").await.unwrap_err();
        assert!(matches!(error, SourceError::ReadDir { .. }));
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = fixture();
        let source = LocalSource::new(dir.path().join("logs"), 1024);

        for path in ["..", "../model.pt", "/etc/passwd"] {
            let error = source.read(path).await.unwrap_err();
            assert!(matches!(error, SourceError::InvalidPath { .. }), "{path}");
        }
    }

    #[tokio::test]
    async fn read_truncates_to_max_bytes() {
        let dir = fixture();
        let source = LocalSource::new(dir.path(), 7);

        assert_eq!(source.read("logs/run.log").await.unwrap(), "epoch 1");
    }

    #[tokio::test]
    async fn read_dir_is_not_a_file() {
        let dir = fixture();
        let source = LocalSource::new(dir.path(), 1024);

        let error = source.read("logs").await.unwrap_err();
        assert!(matches!(error, SourceError::NotAFile { .. }));
    }
}
