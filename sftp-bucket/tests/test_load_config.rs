use std::env;
use std::fs::write;
use std::path::PathBuf;

use serial_test::serial;
use sftp_bucket::load_config::{
    resolve_config_location, ConfigLocation, FileConfigProvider, CONFIG_BUCKET_VARS,
    CONFIG_FILE_VARS,
};
use sftp_bucket_core::contract::ConfigProvider;
use sftp_bucket_core::error::ConfigError;
use tempfile::NamedTempFile;

fn clear_location_env() {
    for name in CONFIG_BUCKET_VARS.iter().chain(CONFIG_FILE_VARS.iter()) {
        env::remove_var(name);
    }
}

#[tokio::test]
async fn file_provider_loads_and_normalises_document() {
    let document = r#"{
        "connection": {"secrets_manager_secret_name": "sftp/partner", "remote_path": "/outbound"},
        "defaults": {"extension": "CSV", "delete_after_transfer": true},
        "transfer_rules": [
            {"name": "daily", "file_pattern": "orders_", "target": {"bucket": "landing", "prefix": "raw/"}},
            {"name": "json", "file_pattern": "", "extension": ".JSON", "target": {"bucket": "landing"}}
        ]
    }"#;
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), document).unwrap();

    let config = FileConfigProvider::new(file.path())
        .load()
        .await
        .expect("config should load");

    assert_eq!(config.connection.secret_id, "sftp/partner");
    assert_eq!(config.connection.remote_path, "/outbound");
    assert_eq!(config.defaults.extension, ".csv");
    assert!(config.defaults.delete_after_transfer);
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[1].extension.as_deref(), Some(".json"));
    assert_eq!(config.rules[1].target.prefix, "");
}

#[tokio::test]
async fn file_provider_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileConfigProvider::new(dir.path().join("absent.json"))
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[tokio::test]
async fn file_provider_reports_invalid_json() {
    let file = NamedTempFile::new().unwrap();
    write(file.path(), "{ not json").unwrap();
    let err = FileConfigProvider::new(file.path()).load().await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
#[serial]
fn explicit_path_wins_over_environment() {
    clear_location_env();
    env::set_var("CONFIG_BUCKET", "cfg-bucket");
    env::set_var("CONFIG_FILE", "jobs/partner.json");

    let location = resolve_config_location(Some(PathBuf::from("local.json"))).unwrap();
    assert_eq!(location, ConfigLocation::File(PathBuf::from("local.json")));
    clear_location_env();
}

#[test]
#[serial]
fn lower_case_variables_are_checked_first() {
    clear_location_env();
    env::set_var("config_bucket", "lower-bucket");
    env::set_var("CONFIG_BUCKET", "upper-bucket");
    env::set_var("CONFIG_FILE", "jobs/partner.json");

    let location = resolve_config_location(None).unwrap();
    assert_eq!(
        location,
        ConfigLocation::Object {
            bucket: "lower-bucket".into(),
            key: "jobs/partner.json".into(),
        }
    );
    clear_location_env();
}

#[test]
#[serial]
fn missing_location_is_a_config_error() {
    clear_location_env();
    env::set_var("CONFIG_BUCKET", "cfg-bucket");

    let err = resolve_config_location(None).unwrap_err();
    assert!(matches!(err, ConfigError::MissingLocation(_)));
    assert!(err.to_string().contains("CONFIG_FILE"));
    clear_location_env();
}
