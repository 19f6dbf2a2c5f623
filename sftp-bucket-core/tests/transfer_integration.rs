use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sftp_bucket_core::config::Config;
use sftp_bucket_core::contract::{MockObjectStore, MockRemoteFileClient, RemoteFile};
use sftp_bucket_core::error::TransferError;
use sftp_bucket_core::summary::NO_MATCHING_RULE;
use sftp_bucket_core::transfer::{run_batch, BatchOptions};

fn daily_config(rule_extras: &str) -> Config {
    Config::from_json(&format!(
        r#"{{
            "connection": {{"secrets_manager_secret_name": "sftp/test", "remote_path": "/out"}},
            "defaults": {{"extension": ".csv"}},
            "transfer_rules": [
                {{
                    "name": "daily",
                    "file_pattern": "orders_",
                    "extension": ".csv",
                    "target": {{"bucket": "b", "prefix": "in/"}}
                    {rule_extras}
                }}
            ]
        }}"#
    ))
    .expect("test config should parse")
}

/// Client that lists `paths`, writes a small file on every download and expects exactly one close.
fn listing_client(paths: &[&str]) -> MockRemoteFileClient {
    let files: Vec<RemoteFile> = paths.iter().map(|p| RemoteFile::new(*p)).collect();
    let mut client = MockRemoteFileClient::new();
    client
        .expect_list_files()
        .times(1)
        .returning(move |_| files.clone());
    client.expect_close().times(1).returning(|| ());
    client
}

fn write_staged(local: &std::path::Path) -> Result<(), TransferError> {
    std::fs::write(local, b"id,amount\n1,10\n").map_err(|e| TransferError::Download {
        remote_path: "test".into(),
        local_path: local.to_path_buf(),
        reason: e.to_string(),
    })
}

type Uploads = Arc<Mutex<Vec<(PathBuf, String, String)>>>;

fn recording_store(uploads: Uploads) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store
        .expect_upload_file()
        .returning(move |local, bucket, key| {
            assert!(local.exists(), "staged file must exist during upload");
            uploads
                .lock()
                .unwrap()
                .push((local.to_path_buf(), bucket.to_string(), key.to_string()));
            Ok(())
        });
    store
}

#[tokio::test]
async fn matching_file_is_processed_with_destination_uri() {
    let config = daily_config("");
    let mut client = listing_client(&["/out/orders_2024.csv"]);
    client
        .expect_download_to_path()
        .times(1)
        .returning(|_, local| write_staged(local));
    client.expect_delete().never();

    let uploads: Uploads = Arc::default();
    let store = recording_store(uploads.clone());

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.skipped_count(), 0);
    assert_eq!(summary.failed_count(), 0);
    let processed = &summary.processed[0];
    assert_eq!(processed.source_path, "/out/orders_2024.csv");
    assert_eq!(processed.destination_uri, "s3://b/in/orders_2024.csv");
    assert_eq!(processed.rule_name, "daily");

    let uploads = uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, "b");
    assert_eq!(uploads[0].2, "in/orders_2024.csv");
}

#[tokio::test]
async fn unmatched_file_is_skipped_without_any_transfer() {
    let config = daily_config("");
    let mut client = listing_client(&["/out/notes.txt"]);
    client.expect_download_to_path().never();
    client.expect_delete().never();
    let mut store = MockObjectStore::new();
    store.expect_upload_file().never();
    store.expect_object_exists().never();

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.skipped_count(), 1);
    assert_eq!(summary.skipped[0].source_path, "/out/notes.txt");
    assert_eq!(summary.skipped[0].reason, NO_MATCHING_RULE);
    assert_eq!(summary.total(), 1);
}

#[tokio::test]
async fn download_failure_does_not_stop_later_files() {
    let config = daily_config("");
    let mut client = listing_client(&[
        "/out/orders_a.csv",
        "/out/readme.md",
        "/out/orders_b.csv",
    ]);
    client
        .expect_download_to_path()
        .times(2)
        .returning(|remote, local| {
            if remote.ends_with("orders_a.csv") {
                Err(TransferError::Download {
                    remote_path: remote.to_string(),
                    local_path: local.to_path_buf(),
                    reason: "No such file".into(),
                })
            } else {
                write_staged(local)
            }
        });

    let uploads: Uploads = Arc::default();
    let store = recording_store(uploads.clone());

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failed[0].source_path, "/out/orders_a.csv");
    assert_eq!(summary.failed[0].rule_name, "daily");
    assert!(summary.failed[0].error_message.contains("No such file"));
    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.processed[0].source_path, "/out/orders_b.csv");
    assert_eq!(summary.skipped_count(), 1);
    assert_eq!(summary.total(), 3);
    assert_eq!(uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_failure_is_recorded_and_source_is_kept() {
    let config = daily_config(r#", "delete_after_transfer": true"#);
    let mut client = listing_client(&["/out/orders_1.csv", "/out/orders_2.csv"]);
    client
        .expect_download_to_path()
        .times(2)
        .returning(|_, local| write_staged(local));
    client
        .expect_delete()
        .times(1)
        .withf(|path| path == "/out/orders_2.csv")
        .returning(|_| Ok(()));

    let mut store = MockObjectStore::new();
    store
        .expect_upload_file()
        .times(2)
        .returning(|local, bucket, key| {
            if key.ends_with("orders_1.csv") {
                Err(TransferError::Upload {
                    local_path: local.to_path_buf(),
                    uri: format!("s3://{bucket}/{key}"),
                    reason: "AccessDenied".into(),
                })
            } else {
                Ok(())
            }
        });

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.failed_count(), 1);
    let failed = &summary.failed[0];
    assert_eq!(failed.rule_name, "daily");
    assert!(failed.error_message.contains("AccessDenied"));
    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.total(), 2);
}

#[tokio::test]
async fn staging_files_are_removed_after_each_attempt() {
    let config = daily_config("");
    let staged: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let staged_in_mock = staged.clone();

    let mut client = listing_client(&["/out/orders_ok.csv", "/out/orders_bad.csv"]);
    client
        .expect_download_to_path()
        .returning(move |_, local| {
            staged_in_mock.lock().unwrap().push(local.to_path_buf());
            write_staged(local)
        });

    let mut store = MockObjectStore::new();
    store.expect_upload_file().returning(|local, _, key| {
        if key.ends_with("orders_bad.csv") {
            Err(TransferError::Upload {
                local_path: local.to_path_buf(),
                uri: key.to_string(),
                reason: "boom".into(),
            })
        } else {
            Ok(())
        }
    });

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;
    assert_eq!(summary.total(), 2);

    let staged = staged.lock().unwrap();
    assert_eq!(staged.len(), 2);
    for path in staged.iter() {
        assert!(!path.exists(), "{} should be removed", path.display());
        assert!(
            !path.parent().unwrap().exists(),
            "staging directory for {} should be removed",
            path.display()
        );
    }
}

#[tokio::test]
async fn delete_failure_marks_file_failed() {
    let config = daily_config(r#", "delete_after_transfer": true"#);
    let mut client = listing_client(&["/out/orders_gone.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));
    client.expect_delete().times(1).returning(|path| {
        Err(TransferError::Delete {
            remote_path: path.to_string(),
            reason: "No such file".into(),
        })
    });
    let store = recording_store(Arc::default());

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.failed_count(), 1);
    assert!(summary.failed[0].error_message.contains("Failed to delete"));
}

#[tokio::test]
async fn archive_dir_moves_source_after_upload() {
    let config = daily_config(r#", "archive_dir": "/archive/done/""#);
    let mut client = listing_client(&["/out/orders_7.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));
    client.expect_delete().never();
    client
        .expect_rename()
        .times(1)
        .withf(|src, dst| src == "/out/orders_7.csv" && dst == "/archive/done/orders_7.csv")
        .returning(|_, _| Ok(()));
    let store = recording_store(Arc::default());

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;
    assert_eq!(summary.processed_count(), 1);
}

#[tokio::test]
async fn overwrite_policy_is_not_checked_unless_enforced() {
    let config = daily_config(r#", "overwrite_existing": false"#);
    let mut client = listing_client(&["/out/orders_1.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));

    let uploads: Uploads = Arc::default();
    let mut store = recording_store(uploads.clone());
    store.expect_object_exists().never();

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;

    assert_eq!(summary.processed[0].destination_uri, "s3://b/in/orders_1.csv");
    assert_eq!(uploads.lock().unwrap()[0].2, "in/orders_1.csv");
}

#[tokio::test]
async fn enforced_policy_suffixes_colliding_key() {
    let config = daily_config(r#", "overwrite_existing": false"#);
    let mut client = listing_client(&["/out/orders_1.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));

    let uploads: Uploads = Arc::default();
    let mut store = recording_store(uploads.clone());
    store
        .expect_object_exists()
        .times(1)
        .withf(|bucket, key| bucket == "b" && key == "in/orders_1.csv")
        .returning(|_, _| Ok(true));

    let options = BatchOptions {
        enforce_overwrite_policy: true,
    };
    let summary = run_batch(&config, &client, &store, &options).await;

    let key = uploads.lock().unwrap()[0].2.clone();
    assert!(key.starts_with("in/orders_1__"), "unexpected key {key}");
    assert!(key.ends_with(".csv"), "unexpected key {key}");
    // in/orders_1__YYYYMMDD-HHMMSS.csv
    assert_eq!(key.len(), "in/orders_1__".len() + 15 + ".csv".len());
    assert_eq!(summary.processed[0].destination_uri, format!("s3://b/{key}"));
}

#[tokio::test]
async fn enforced_policy_keeps_key_when_destination_is_free() {
    let config = daily_config(r#", "overwrite_existing": false"#);
    let mut client = listing_client(&["/out/orders_1.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));

    let uploads: Uploads = Arc::default();
    let mut store = recording_store(uploads.clone());
    store.expect_object_exists().returning(|_, _| Ok(false));

    let options = BatchOptions {
        enforce_overwrite_policy: true,
    };
    run_batch(&config, &client, &store, &options).await;

    assert_eq!(uploads.lock().unwrap()[0].2, "in/orders_1.csv");
}

#[tokio::test]
async fn enforced_policy_skips_check_when_overwrite_allowed() {
    let config = daily_config(r#", "overwrite_existing": true"#);
    let mut client = listing_client(&["/out/orders_1.csv"]);
    client
        .expect_download_to_path()
        .returning(|_, local| write_staged(local));
    let mut store = recording_store(Arc::default());
    store.expect_object_exists().never();

    let options = BatchOptions {
        enforce_overwrite_policy: true,
    };
    let summary = run_batch(&config, &client, &store, &options).await;
    assert_eq!(summary.processed_count(), 1);
}

#[tokio::test]
async fn failed_existence_check_fails_only_that_file() {
    let config = daily_config(r#", "overwrite_existing": false"#);
    let mut client = listing_client(&["/out/orders_1.csv"]);
    client.expect_download_to_path().never();
    let mut store = MockObjectStore::new();
    store.expect_upload_file().never();
    store.expect_object_exists().returning(|bucket, key| {
        Err(TransferError::DestinationCheck {
            uri: format!("s3://{bucket}/{key}"),
            reason: "Forbidden".into(),
        })
    });

    let options = BatchOptions {
        enforce_overwrite_policy: true,
    };
    let summary = run_batch(&config, &client, &store, &options).await;
    assert_eq!(summary.failed_count(), 1);
    assert!(summary.failed[0].error_message.contains("Forbidden"));
}

#[tokio::test]
async fn empty_listing_still_closes_connection() {
    let config = daily_config("");
    let client = listing_client(&[]);
    let store = MockObjectStore::new();

    let summary = run_batch(&config, &client, &store, &BatchOptions::default()).await;
    assert_eq!(summary.total(), 0);
}

#[tokio::test]
async fn connection_is_closed_when_file_loop_panics() {
    let closed = Arc::new(AtomicBool::new(false));
    let closed_in_mock = closed.clone();

    let handle = tokio::spawn(async move {
        let config = daily_config("");
        let files = vec![RemoteFile::new("/out/orders_1.csv")];
        let mut client = MockRemoteFileClient::new();
        client.expect_list_files().returning(move |_| files.clone());
        client
            .expect_download_to_path()
            .returning(|_, local| write_staged(local));
        client.expect_close().times(1).returning(move || {
            closed_in_mock.store(true, Ordering::SeqCst);
        });
        let mut store = MockObjectStore::new();
        store
            .expect_upload_file()
            .returning(|_, _, _| panic!("object store exploded"));

        run_batch(&config, &client, &store, &BatchOptions::default()).await
    });

    let err = handle.await.expect_err("batch should propagate the panic");
    assert!(err.is_panic());
    assert!(closed.load(Ordering::SeqCst), "close must run before unwinding");
}
