use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use sftp_bucket_core::contract::SecretResolver;
use sftp_bucket_core::credential::SecretPayload;
use sftp_bucket_core::error::SecretError;
use tracing::debug;

/// [`SecretResolver`] backed by AWS Secrets Manager `GetSecretValue`.
pub struct SecretsManagerResolver {
    client: Client,
}

impl SecretsManagerResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretResolver for SecretsManagerResolver {
    async fn resolve(&self, secret_id: &str) -> Result<SecretPayload, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| SecretError::Fetch {
                secret_id: secret_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let raw = output
            .secret_string()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SecretError::Empty(secret_id.to_string()))?;
        debug!(secret_id, "Fetched secret value");
        SecretPayload::parse(raw)
    }
}
