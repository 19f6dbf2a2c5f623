//! Error taxonomy for a transfer batch.
//!
//! `ConfigError`, `SecretError` and `ConnectionError` are fatal: they abort the
//! invocation before (or instead of) the file loop. `TransferError` is scoped to
//! a single file and is turned into a `Failed` outcome by the orchestrator.

use std::path::PathBuf;

use thiserror::Error;

/// The configuration location or document is missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing config location: set {0}")]
    MissingLocation(&'static str),

    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch config document {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("Config document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// The secret could not be fetched, or its payload is not a usable credential.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Failed to fetch secret {secret_id}: {reason}")]
    Fetch { secret_id: String, reason: String },

    #[error("Secret {0} has no string value")]
    Empty(String),

    #[error("Secret is missing 'host'")]
    MissingHost,

    #[error("Secret is missing 'username'")]
    MissingUsername,

    #[error("Secret must include either 'password' or 'private_key'")]
    MissingCredential,

    #[error("Secret has an invalid 'port': {0}")]
    InvalidPort(String),

    #[error("Secret JSON must be an object")]
    NotAnObject,

    #[error("Secret value is opaque and cannot be used as a credential")]
    Unstructured,
}

/// The remote server could not be reached or rejected authentication.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Authentication rejected for {username}@{host}: {reason}")]
    AuthenticationRejected {
        host: String,
        username: String,
        reason: String,
    },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Failed to open SFTP subsystem: {0}")]
    Subsystem(String),

    #[error("Local root {0:?} is not a directory")]
    InvalidLocalRoot(PathBuf),
}

/// A failure while moving one file. Never aborts the batch.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to create staging directory: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Failed to download {remote_path} to {local_path:?}: {reason}")]
    Download {
        remote_path: String,
        local_path: PathBuf,
        reason: String,
    },

    #[error("Failed to upload {local_path:?} to {uri}: {reason}")]
    Upload {
        local_path: PathBuf,
        uri: String,
        reason: String,
    },

    #[error("Failed to check whether {uri} exists: {reason}")]
    DestinationCheck { uri: String, reason: String },

    #[error("Failed to delete {remote_path}: {reason}")]
    Delete { remote_path: String, reason: String },

    #[error("Failed to rename {src} to {dst}: {reason}")]
    Rename {
        src: String,
        dst: String,
        reason: String,
    },

    #[error("Failed to create directory {directory}: {reason}")]
    CreateDir { directory: String, reason: String },
}

/// Anything that aborts a whole invocation. No partial summary is produced.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
