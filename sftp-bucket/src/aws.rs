//! Shared AWS SDK configuration for the S3 and Secrets Manager adapters.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

/// Overrides applied on top of the default AWS credential/region chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: Option<String>,
    /// Custom endpoint (LocalStack and similar). Forces path-style S3 access.
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        info!(
            region = ?config.region().map(|r| r.as_ref().to_string()),
            endpoint_url = ?self.endpoint_url,
            "Loaded AWS SDK configuration"
        );
        config
    }

    pub fn s3_client(&self, sdk: &SdkConfig) -> aws_sdk_s3::Client {
        let builder = aws_sdk_s3::config::Builder::from(sdk);
        let s3_config = if self.endpoint_url.is_some() {
            builder.force_path_style(true).build()
        } else {
            builder.build()
        };
        aws_sdk_s3::Client::from_conf(s3_config)
    }

    pub fn secrets_client(&self, sdk: &SdkConfig) -> aws_sdk_secretsmanager::Client {
        aws_sdk_secretsmanager::Client::new(sdk)
    }
}
