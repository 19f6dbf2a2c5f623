//! [`RemoteFileClient`] over a local directory tree.
//!
//! Remote paths are interpreted relative to a root: `/outbound/a.csv` maps to
//! `<root>/outbound/a.csv`. `..` and other non-normal components are dropped,
//! so nothing outside the root is ever touched.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::contract::{remote_parent, RemoteFile, RemoteFileClient};
use crate::error::{ConnectionError, TransferError};

#[derive(Debug, Clone)]
pub struct LocalDirClient {
    root: PathBuf,
}

impl LocalDirClient {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConnectionError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConnectionError::InvalidLocalRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, remote_path: &str) -> PathBuf {
        Path::new(remote_path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

#[async_trait]
impl RemoteFileClient for LocalDirClient {
    async fn list_files(&self, directory: &str) -> Vec<RemoteFile> {
        let dir = self.resolve(directory);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(directory, error = %e, "Cannot read directory; treating as empty");
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(directory, error = %e, "Error while reading directory; listing truncated");
                    break;
                }
            };
            // DirEntry::file_type does not follow symlinks, so links are excluded here.
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping non UTF-8 file name"),
            }
        }
        names.sort();

        let base = directory.trim_end_matches('/');
        names
            .into_iter()
            .map(|name| RemoteFile::new(format!("{base}/{name}")))
            .collect()
    }

    async fn download_to_path(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), TransferError> {
        tokio::fs::copy(self.resolve(remote_path), local_path)
            .await
            .map(|_| ())
            .map_err(|e| TransferError::Download {
                remote_path: remote_path.to_string(),
                local_path: local_path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), TransferError> {
        self.ensure_dir(remote_parent(dst)).await?;
        tokio::fs::rename(self.resolve(src), self.resolve(dst))
            .await
            .map_err(|e| TransferError::Rename {
                src: src.to_string(),
                dst: dst.to_string(),
                reason: e.to_string(),
            })
    }

    async fn delete(&self, remote_path: &str) -> Result<(), TransferError> {
        tokio::fs::remove_file(self.resolve(remote_path))
            .await
            .map_err(|e| TransferError::Delete {
                remote_path: remote_path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn ensure_dir(&self, directory: &str) -> Result<(), TransferError> {
        if directory.trim_matches('/').is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(self.resolve(directory))
            .await
            .map_err(|e| TransferError::CreateDir {
                directory: directory.to_string(),
                reason: e.to_string(),
            })
    }

    async fn close(&self) {
        debug!(root = %self.root.display(), "Closing local directory client");
    }
}
