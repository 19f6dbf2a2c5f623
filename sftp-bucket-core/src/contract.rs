//! # contract: the seams between the orchestrator and the outside world
//!
//! The orchestrator only ever talks to these traits. Concrete implementations
//! live elsewhere: SFTP and S3 adapters in the `sftp-bucket` crate, the local
//! directory client in [`crate::local`], and `mockall` mocks for tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; mocks are exported when the
//!   `test-export-mocks` feature is on (the default), so integration tests and
//!   dependent crates can use `MockRemoteFileClient`, `MockObjectStore`, etc.
//!
//! ## Errors
//! - Remote and object-store operations return [`TransferError`], which the
//!   orchestrator records per file.
//! - Configuration, secret and connection failures use their own fatal error
//!   types and abort the invocation.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::Config;
use crate::credential::{Credential, SecretPayload};
use crate::error::{ConfigError, ConnectionError, SecretError, TransferError};

/// A regular file discovered on the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Last `/`-separated segment of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Parent directory of a `/`-separated remote path (`""` for a bare name).
pub fn remote_parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}

/// Protocol-agnostic capabilities of a remote file server.
///
/// One connection per batch. `close` is always called by the orchestrator,
/// whatever happens in the file loop.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteFileClient: Send + Sync {
    /// Regular files under `directory`. An unreadable directory yields an
    /// empty list (logged), never an error.
    async fn list_files(&self, directory: &str) -> Vec<RemoteFile>;

    /// Fails if the remote file is missing or the local path is not writable.
    async fn download_to_path(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), TransferError>;

    /// Creates missing parent directories of `dst` before renaming.
    async fn rename(&self, src: &str, dst: &str) -> Result<(), TransferError>;

    /// Fails if the remote file no longer exists.
    async fn delete(&self, remote_path: &str) -> Result<(), TransferError>;

    /// Idempotent recursive creation. `/` and the empty path are no-ops.
    async fn ensure_dir(&self, directory: &str) -> Result<(), TransferError>;

    /// Best-effort release of every underlying resource. Never fails.
    async fn close(&self);
}

/// Destination object storage addressed by bucket and key.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), TransferError>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, TransferError>;
}

/// Supplies the configuration document for one invocation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn load(&self) -> Result<Config, ConfigError>;
}

/// Resolves an opaque secret identifier into a classified payload.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, secret_id: &str) -> Result<SecretPayload, SecretError>;
}

/// Opens a [`RemoteFileClient`] for a credential.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteFileClient>, ConnectionError>;
}
