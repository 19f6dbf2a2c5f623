//! Where the configuration document comes from.
//!
//! Either a local JSON file (`--config`) or an S3 object located through the
//! `config_bucket`/`CONFIG_BUCKET` and `config_file`/`CONFIG_FILE` environment
//! variables. The lower-case name is checked first.

use std::env;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sftp_bucket_core::config::Config;
use sftp_bucket_core::contract::ConfigProvider;
use sftp_bucket_core::error::ConfigError;
use tracing::{error, info};

pub const CONFIG_BUCKET_VARS: [&str; 2] = ["config_bucket", "CONFIG_BUCKET"];
pub const CONFIG_FILE_VARS: [&str; 2] = ["config_file", "CONFIG_FILE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    File(PathBuf),
    Object { bucket: String, key: String },
}

/// An explicit path wins; otherwise both S3 location variables must be set.
pub fn resolve_config_location(path: Option<PathBuf>) -> Result<ConfigLocation, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigLocation::File(path));
    }
    let bucket = first_env(&CONFIG_BUCKET_VARS)
        .ok_or(ConfigError::MissingLocation("config_bucket or CONFIG_BUCKET"))?;
    let key = first_env(&CONFIG_FILE_VARS)
        .ok_or(ConfigError::MissingLocation("config_file or CONFIG_FILE"))?;
    Ok(ConfigLocation::Object { bucket, key })
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> Result<Config, ConfigError> {
        info!(config_path = ?self.path, "Loading configuration from file");
        let document = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| {
                error!(error = ?source, config_path = ?self.path, "Failed to read config file");
                ConfigError::ReadFile {
                    path: self.path.clone(),
                    source,
                }
            })?;
        Config::from_json(&document)
    }
}
