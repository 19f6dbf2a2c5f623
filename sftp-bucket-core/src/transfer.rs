//! Batch orchestration: list → match → download → upload → delete/archive.
//!
//! The orchestrator owns the connection for the whole batch and processes files
//! strictly one at a time, in listing order. Any [`TransferError`] is caught at
//! the per-file boundary and recorded as a `Failed` outcome; the batch always
//! moves on to the next file. The connection is closed on every exit path,
//! including a panic inside the file loop.
//!
//! # Collision policy
//! With [`BatchOptions::enforce_overwrite_policy`] off (the default) existing
//! destination objects are always overwritten. With it on, a rule whose
//! effective `overwrite_existing` is false gets its key suffixed with a UTC
//! timestamp when the destination already exists.

use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TransferRule};
use crate::contract::{ObjectStore, RemoteFile, RemoteFileClient};
use crate::destination::{archive_path, destination_key, destination_uri, suffix_key};
use crate::error::TransferError;
use crate::rules::match_rule;
use crate::summary::{
    BatchSummary, FailedFile, FileOutcome, ProcessedFile, SkippedFile, NO_MATCHING_RULE,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Honour `overwrite_existing = false` by checking for and suffixing
    /// colliding destination keys.
    pub enforce_overwrite_policy: bool,
}

/// Runs one batch against an already connected client, then closes it.
pub async fn run_batch<C, O>(
    config: &Config,
    client: &C,
    store: &O,
    options: &BatchOptions,
) -> BatchSummary
where
    C: RemoteFileClient + ?Sized,
    O: ObjectStore + ?Sized,
{
    info!(
        remote_path = %config.connection.remote_path,
        rules = config.rules.len(),
        enforce_overwrite_policy = options.enforce_overwrite_policy,
        "[BATCH] Starting transfer batch"
    );
    warn_if_overwrite_policy_ignored(config, options);

    let result = AssertUnwindSafe(transfer_all(config, client, store, options))
        .catch_unwind()
        .await;

    client.close().await;
    debug!("[BATCH] Remote connection closed");

    match result {
        Ok(summary) => {
            info!(
                processed = summary.processed_count(),
                skipped = summary.skipped_count(),
                failed = summary.failed_count(),
                "[BATCH] Transfer batch complete"
            );
            summary
        }
        Err(panic) => {
            error!("[BATCH][ERROR] File loop panicked; connection was closed before unwinding");
            std::panic::resume_unwind(panic)
        }
    }
}

async fn transfer_all<C, O>(
    config: &Config,
    client: &C,
    store: &O,
    options: &BatchOptions,
) -> BatchSummary
where
    C: RemoteFileClient + ?Sized,
    O: ObjectStore + ?Sized,
{
    let files = client.list_files(&config.connection.remote_path).await;
    info!(
        count = files.len(),
        remote_path = %config.connection.remote_path,
        "[BATCH] Listed remote files"
    );

    let mut summary = BatchSummary::default();
    for file in &files {
        let outcome = process_file(config, client, store, options, file).await;
        summary.record(outcome);
    }
    summary
}

/// Produces the outcome for a single discovered file. Never fails.
pub async fn process_file<C, O>(
    config: &Config,
    client: &C,
    store: &O,
    options: &BatchOptions,
    file: &RemoteFile,
) -> FileOutcome
where
    C: RemoteFileClient + ?Sized,
    O: ObjectStore + ?Sized,
{
    let file_name = file.file_name();
    let Some(rule) = match_rule(file_name, &config.rules, &config.defaults) else {
        info!(file = %file.path, "[BATCH] Skipping file: no matching rule");
        return FileOutcome::Skipped(SkippedFile {
            source_path: file.path.clone(),
            reason: NO_MATCHING_RULE.to_string(),
        });
    };

    debug!(file = %file.path, rule = %rule.name, "[BATCH] Matched transfer rule");
    match transfer_file(config, client, store, options, file, rule).await {
        Ok(destination_uri) => {
            info!(file = %file.path, s3 = %destination_uri, rule = %rule.name, "[BATCH] Transferred file");
            FileOutcome::Processed(ProcessedFile {
                source_path: file.path.clone(),
                destination_uri,
                rule_name: rule.name.clone(),
            })
        }
        Err(e) => {
            error!(file = %file.path, rule = %rule.name, error = %e, "[BATCH][ERROR] Transfer failed");
            FileOutcome::Failed(FailedFile {
                source_path: file.path.clone(),
                error_message: e.to_string(),
                rule_name: rule.name.clone(),
            })
        }
    }
}

async fn transfer_file<C, O>(
    config: &Config,
    client: &C,
    store: &O,
    options: &BatchOptions,
    file: &RemoteFile,
    rule: &TransferRule,
) -> Result<String, TransferError>
where
    C: RemoteFileClient + ?Sized,
    O: ObjectStore + ?Sized,
{
    let defaults = &config.defaults;
    let file_name = file.file_name();
    let bucket = &rule.target.bucket;

    let mut key = destination_key(&rule.target.prefix, file_name);
    if options.enforce_overwrite_policy
        && !rule.effective_overwrite(defaults)
        && store.object_exists(bucket, &key).await?
    {
        let suffixed = suffix_key(&key, Utc::now());
        info!(bucket = %bucket, key = %key, new_key = %suffixed, "[BATCH] Destination exists; suffixing key");
        key = suffixed;
    }
    let uri = destination_uri(bucket, &key);

    {
        // Dropped (and removed) at the end of this block on every path.
        let staging = tempfile::tempdir().map_err(TransferError::Staging)?;
        let local_path = staging.path().join(file_name);
        client.download_to_path(&file.path, &local_path).await?;
        debug!(file = %file.path, local = %local_path.display(), "[BATCH] Downloaded to staging");
        store.upload_file(&local_path, bucket, &key).await?;
    }

    if rule.effective_delete(defaults) {
        client.delete(&file.path).await?;
        debug!(file = %file.path, "[BATCH] Deleted source file");
    } else if let Some(archive_dir) = rule.effective_archive_dir(defaults) {
        let archived = archive_path(archive_dir, file_name);
        client.rename(&file.path, &archived).await?;
        debug!(file = %file.path, archived = %archived, "[BATCH] Archived source file");
    }

    Ok(uri)
}

fn warn_if_overwrite_policy_ignored(config: &Config, options: &BatchOptions) {
    if options.enforce_overwrite_policy {
        return;
    }
    let ignored: Vec<&str> = config
        .rules
        .iter()
        .filter(|rule| !rule.effective_overwrite(&config.defaults))
        .map(|rule| rule.name.as_str())
        .collect();
    if !ignored.is_empty() {
        warn!(
            rules = ?ignored,
            "[BATCH] overwrite_existing=false is not enforced; existing objects will be overwritten"
        );
    }
}
