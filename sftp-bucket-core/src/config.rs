//! Transfer configuration: connection, default policy and ordered rules.
//!
//! The JSON document is parsed into loosely-typed `Raw*` structs first and then
//! validated and normalised into the domain types below, so every consumer sees
//! resolved defaults and lower-cased, dot-prefixed extensions.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;

const DEFAULT_EXTENSION: &str = ".csv";
const DEFAULT_REMOTE_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub connection: ConnectionSpec,
    pub defaults: Defaults,
    /// Evaluated in declared order; first match wins.
    pub rules: Vec<TransferRule>,
}

/// Which secret to resolve and which remote directory to scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSpec {
    pub secret_id: String,
    pub remote_path: String,
}

/// Fallback policy for fields a rule leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub extension: String,
    pub delete_after_transfer: bool,
    pub overwrite_existing: bool,
    pub archive_dir: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            delete_after_transfer: false,
            overwrite_existing: false,
            archive_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRule {
    /// Used for reporting. Assumed unique, not enforced.
    pub name: String,
    /// Literal, case-sensitive file name prefix.
    pub file_pattern: String,
    pub extension: Option<String>,
    pub target: Target,
    pub delete_after_transfer: Option<bool>,
    pub overwrite_existing: Option<bool>,
    pub archive_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub bucket: String,
    pub prefix: String,
}

impl TransferRule {
    pub fn effective_extension<'a>(&'a self, defaults: &'a Defaults) -> &'a str {
        self.extension.as_deref().unwrap_or(&defaults.extension)
    }

    pub fn effective_delete(&self, defaults: &Defaults) -> bool {
        self.delete_after_transfer
            .unwrap_or(defaults.delete_after_transfer)
    }

    pub fn effective_overwrite(&self, defaults: &Defaults) -> bool {
        self.overwrite_existing.unwrap_or(defaults.overwrite_existing)
    }

    pub fn effective_archive_dir<'a>(&'a self, defaults: &'a Defaults) -> Option<&'a str> {
        self.archive_dir
            .as_deref()
            .or(defaults.archive_dir.as_deref())
    }
}

#[derive(Deserialize)]
struct RawConfig {
    connection: Option<RawConnection>,
    #[serde(default)]
    defaults: Option<RawDefaults>,
    #[serde(default)]
    transfer_rules: Option<Vec<RawRule>>,
}

#[derive(Deserialize)]
struct RawConnection {
    secrets_manager_secret_name: Option<String>,
    remote_path: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawDefaults {
    extension: Option<String>,
    delete_after_transfer: Option<bool>,
    overwrite_existing: Option<bool>,
    archive_dir: Option<String>,
}

#[derive(Deserialize)]
struct RawRule {
    name: Option<String>,
    file_pattern: Option<String>,
    extension: Option<String>,
    target: Option<RawTarget>,
    delete_after_transfer: Option<bool>,
    overwrite_existing: Option<bool>,
    archive_dir: Option<String>,
}

#[derive(Deserialize)]
struct RawTarget {
    bucket: Option<String>,
    prefix: Option<String>,
}

/// Lower-cases an extension and makes sure it starts with a dot.
/// Blank input yields `None` so callers can fall back to a default.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Some(lower)
    } else {
        Some(format!(".{lower}"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Parses and validates a configuration document.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(document)?;

        let connection = raw
            .connection
            .ok_or_else(|| ConfigError::Invalid("missing 'connection' section".into()))?;
        let secret_id = non_blank(connection.secrets_manager_secret_name).ok_or_else(|| {
            ConfigError::Invalid("missing 'connection.secrets_manager_secret_name'".into())
        })?;
        let remote_path =
            non_blank(connection.remote_path).unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string());

        let raw_defaults = raw.defaults.unwrap_or_default();
        let defaults = Defaults {
            extension: raw_defaults
                .extension
                .as_deref()
                .and_then(normalize_extension)
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            delete_after_transfer: raw_defaults.delete_after_transfer.unwrap_or(false),
            overwrite_existing: raw_defaults.overwrite_existing.unwrap_or(false),
            archive_dir: non_blank(raw_defaults.archive_dir),
        };

        let rules = raw
            .transfer_rules
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.into_rule(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            connection: ConnectionSpec {
                secret_id,
                remote_path,
            },
            defaults,
            rules,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            secret_id = %self.connection.secret_id,
            remote_path = %self.connection.remote_path,
            default_extension = %self.defaults.extension,
            rules_count = self.rules.len(),
            "Loaded Config"
        );
        for rule in &self.rules {
            debug!(
                rule = %rule.name,
                file_pattern = %rule.file_pattern,
                extension = rule.effective_extension(&self.defaults),
                bucket = %rule.target.bucket,
                prefix = %rule.target.prefix,
                "Loaded transfer rule"
            );
        }
    }
}

impl RawRule {
    fn into_rule(self, index: usize) -> Result<TransferRule, ConfigError> {
        let name = non_blank(self.name).ok_or_else(|| {
            ConfigError::Invalid(format!("transfer_rules[{index}] is missing 'name'"))
        })?;
        let file_pattern = self.file_pattern.ok_or_else(|| {
            ConfigError::Invalid(format!("transfer rule '{name}' is missing 'file_pattern'"))
        })?;
        let target = self.target.ok_or_else(|| {
            ConfigError::Invalid(format!("transfer rule '{name}' is missing 'target'"))
        })?;
        let bucket = non_blank(target.bucket).ok_or_else(|| {
            ConfigError::Invalid(format!("transfer rule '{name}' is missing 'target.bucket'"))
        })?;

        Ok(TransferRule {
            extension: self.extension.as_deref().and_then(normalize_extension),
            target: Target {
                bucket,
                prefix: target.prefix.unwrap_or_default(),
            },
            delete_after_transfer: self.delete_after_transfer,
            overwrite_existing: self.overwrite_existing,
            archive_dir: non_blank(self.archive_dir),
            name,
            file_pattern,
        })
    }
}
