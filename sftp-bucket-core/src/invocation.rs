//! One invocation: config → secret → connect → batch.
//!
//! Everything before the file loop is fatal. A failure here returns an
//! [`InvocationError`] and no summary; nothing is connected when the config
//! or secret step fails.

use tracing::{error, info};

use crate::contract::{ConfigProvider, ObjectStore, RemoteConnector, SecretResolver};
use crate::credential::Credential;
use crate::error::InvocationError;
use crate::summary::BatchSummary;
use crate::transfer::{run_batch, BatchOptions};

pub async fn invoke<P, R, K, O>(
    config_provider: &P,
    secrets: &R,
    connector: &K,
    store: &O,
    options: &BatchOptions,
) -> Result<BatchSummary, InvocationError>
where
    P: ConfigProvider + ?Sized,
    R: SecretResolver + ?Sized,
    K: RemoteConnector + ?Sized,
    O: ObjectStore + ?Sized,
{
    let config = config_provider.load().await.map_err(|e| {
        error!(error = %e, "[INVOKE][ERROR] Failed to load configuration");
        e
    })?;
    config.trace_loaded();

    let credential = secrets
        .resolve(&config.connection.secret_id)
        .await
        .and_then(Credential::try_from)
        .map_err(|e| {
            error!(secret_id = %config.connection.secret_id, error = %e, "[INVOKE][ERROR] Unusable secret");
            e
        })?;
    info!(
        host = %credential.host,
        port = credential.port,
        username = %credential.username,
        auth = credential.auth.method(),
        "[INVOKE] Resolved connection credential"
    );

    let client = connector.connect(&credential).await.map_err(|e| {
        error!(host = %credential.host, error = %e, "[INVOKE][ERROR] Failed to connect");
        e
    })?;

    Ok(run_batch(&config, client.as_ref(), store, options).await)
}
