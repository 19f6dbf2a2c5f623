//! SFTP adapter: [`RemoteFileClient`] over an SSH connection (russh + russh-sftp).
//!
//! One [`SftpRemote`] owns one SSH transport and one SFTP session for the
//! whole batch. [`SftpConnector`] performs the handshake and authentication.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Handler};
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey};
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use secrecy::ExposeSecret;
use sftp_bucket_core::contract::{remote_parent, RemoteConnector, RemoteFile, RemoteFileClient};
use sftp_bucket_core::credential::{Auth, Credential};
use sftp_bucket_core::error::{ConnectionError, TransferError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Accepts every server host key and logs its fingerprint.
pub struct HostKeyLogger {
    host: String,
    port: u16,
}

impl Handler for HostKeyLogger {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        info!(
            host = %self.host,
            port = self.port,
            algorithm = %server_public_key.algorithm(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Accepting server host key"
        );
        async { Ok(true) }
    }
}

/// No inactivity timeout: an idle channel during a long upload stays open.
/// Keepalives only detect a dead peer.
fn client_config() -> client::Config {
    client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(60)),
        keepalive_max: 3,
        ..Default::default()
    }
}

/// Collapses repeated and trailing separators: `//a//b/` becomes `/a/b`.
/// The root stays `/` and a blank path stays empty.
fn normalize_remote_dir(directory: &str) -> String {
    let joined = directory
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if directory.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Every ancestor of `directory`, outermost first, ending with the directory
/// itself. Empty for `/` and the blank path.
fn ancestor_dirs(directory: &str) -> Vec<String> {
    let normalized = normalize_remote_dir(directory);
    let absolute = normalized.starts_with('/');
    let mut current = String::new();
    normalized
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if absolute || !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            current.clone()
        })
        .collect()
}

fn remote_child(directory: &str, name: &str) -> String {
    match normalize_remote_dir(directory).as_str() {
        "" => name.to_string(),
        "/" => format!("/{name}"),
        dir => format!("{dir}/{name}"),
    }
}

pub struct SftpConnector {
    config: Arc<client::Config>,
}

impl Default for SftpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SftpConnector {
    pub fn new() -> Self {
        Self {
            config: Arc::new(client_config()),
        }
    }

    async fn authenticate(
        handle: &mut Handle<HostKeyLogger>,
        credential: &Credential,
    ) -> Result<(), ConnectionError> {
        let rejected = |reason: String| ConnectionError::AuthenticationRejected {
            host: credential.host.clone(),
            username: credential.username.clone(),
            reason,
        };

        let result = match &credential.auth {
            Auth::Password(password) => handle
                .authenticate_password(&credential.username, password.expose_secret())
                .await
                .map_err(|e| rejected(e.to_string()))?,
            Auth::PrivateKey(pem) => {
                let key = russh::keys::decode_secret_key(pem.expose_secret(), None)
                    .map_err(|e| ConnectionError::InvalidKey(e.to_string()))?;
                let hash_alg = if key.algorithm().is_rsa() {
                    Some(HashAlg::Sha512)
                } else {
                    None
                };
                handle
                    .authenticate_publickey(
                        &credential.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(|e| rejected(e.to_string()))?
            }
        };

        if !result.success() {
            return Err(rejected("authentication rejected by server".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteConnector for SftpConnector {
    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteFileClient>, ConnectionError> {
        let unreachable = |reason: String| ConnectionError::Unreachable {
            host: credential.host.clone(),
            port: credential.port,
            reason,
        };

        let handler = HostKeyLogger {
            host: credential.host.clone(),
            port: credential.port,
        };
        let address = (credential.host.as_str(), credential.port);
        let mut handle = client::connect(self.config.clone(), address, handler)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        Self::authenticate(&mut handle, credential).await?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ConnectionError::Subsystem(format!("failed to open channel: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| ConnectionError::Subsystem(e.to_string()))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| ConnectionError::Subsystem(e.to_string()))?;

        info!(
            host = %credential.host,
            port = credential.port,
            username = %credential.username,
            auth = credential.auth.method(),
            "Connected to SFTP server"
        );
        Ok(Box::new(SftpRemote {
            host: credential.host.clone(),
            sftp: Mutex::new(sftp),
            handle: Mutex::new(Some(handle)),
        }))
    }
}

pub struct SftpRemote {
    host: String,
    sftp: Mutex<SftpSession>,
    handle: Mutex<Option<Handle<HostKeyLogger>>>,
}

#[async_trait]
impl RemoteFileClient for SftpRemote {
    async fn list_files(&self, directory: &str) -> Vec<RemoteFile> {
        let entries = match self.sftp.lock().await.read_dir(directory).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(directory, error = %e, "Cannot list remote directory; treating as empty");
                return Vec::new();
            }
        };

        entries
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| RemoteFile::new(remote_child(directory, &entry.file_name())))
            .collect()
    }

    async fn download_to_path(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), TransferError> {
        let download_error = |reason: String| TransferError::Download {
            remote_path: remote_path.to_string(),
            local_path: local_path.to_path_buf(),
            reason,
        };

        let sftp = self.sftp.lock().await;
        let mut remote = sftp
            .open(remote_path)
            .await
            .map_err(|e| download_error(e.to_string()))?;
        let mut local = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| download_error(e.to_string()))?;
        let bytes = tokio::io::copy(&mut remote, &mut local)
            .await
            .map_err(|e| download_error(e.to_string()))?;

        debug!(remote_path, bytes, "Downloaded remote file");
        Ok(())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), TransferError> {
        self.ensure_dir(remote_parent(dst)).await?;
        self.sftp
            .lock()
            .await
            .rename(src, dst)
            .await
            .map_err(|e| TransferError::Rename {
                src: src.to_string(),
                dst: dst.to_string(),
                reason: e.to_string(),
            })
    }

    async fn delete(&self, remote_path: &str) -> Result<(), TransferError> {
        self.sftp
            .lock()
            .await
            .remove_file(remote_path)
            .await
            .map_err(|e| TransferError::Delete {
                remote_path: remote_path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn ensure_dir(&self, directory: &str) -> Result<(), TransferError> {
        let sftp = self.sftp.lock().await;
        for current in ancestor_dirs(directory) {
            if let Err(e) = sftp.create_dir(current.as_str()).await {
                let exists = sftp
                    .metadata(current.as_str())
                    .await
                    .is_ok_and(|m| m.is_dir());
                if !exists {
                    return Err(TransferError::CreateDir {
                        directory: current,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.sftp.lock().await.close().await {
            warn!(host = %self.host, error = %e, "Failed to close SFTP session");
        }
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "batch complete", "en")
                .await
            {
                warn!(host = %self.host, error = %e, "Failed to disconnect SSH transport");
            }
        }
        debug!(host = %self.host, "SFTP connection closed");
    }
}
