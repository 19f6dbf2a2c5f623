//! # sftp-bucket CLI
//!
//! Command parsing and wiring of the concrete adapters (SFTP, S3, Secrets
//! Manager) into [`sftp_bucket_core::invocation::invoke`]. Transfer logic lives
//! in `sftp-bucket-core`; this module only builds collaborators and prints the
//! result.
//!
//! For programmatic and integration use, call [`run`] with a constructed [`Cli`].

use std::path::PathBuf;

use anyhow::Result;
use aws_config::SdkConfig;
use clap::{Parser, Subcommand};
use sftp_bucket_core::contract::ConfigProvider;
use sftp_bucket_core::invocation::invoke;
use sftp_bucket_core::local::LocalDirClient;
use sftp_bucket_core::summary::BatchSummary;
use sftp_bucket_core::transfer::{run_batch, BatchOptions};
use tracing::{error, info};

use crate::aws::AwsSettings;
use crate::load_config::{resolve_config_location, ConfigLocation, FileConfigProvider};
use crate::s3::{S3ConfigProvider, S3ObjectStore};
use crate::secrets::SecretsManagerResolver;
use crate::sftp::SftpConnector;

#[derive(Parser)]
#[clap(
    name = "sftp-bucket",
    version,
    about = "Pull files from an SFTP server and route them into S3 buckets by rule"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one transfer batch and print the result as JSON
    Run {
        /// Local JSON config file. Without it the document is read from S3
        /// (config_bucket/CONFIG_BUCKET and config_file/CONFIG_FILE).
        #[clap(long)]
        config: Option<PathBuf>,

        /// Read source files from this local directory instead of SFTP.
        /// No secret is fetched and no SSH connection is made.
        #[clap(long)]
        local_root: Option<PathBuf>,

        /// Suffix colliding destination keys for rules with overwrite_existing = false
        #[clap(long, env = "ENFORCE_OVERWRITE_POLICY")]
        enforce_overwrite_policy: bool,

        /// AWS region override
        #[clap(long)]
        region: Option<String>,

        /// S3 / Secrets Manager endpoint override (e.g. LocalStack)
        #[clap(long)]
        endpoint_url: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            local_root,
            enforce_overwrite_policy,
            region,
            endpoint_url,
        } => {
            let options = BatchOptions {
                enforce_overwrite_policy,
            };
            let aws = AwsSettings {
                region,
                endpoint_url,
            };
            info!(
                command = "run",
                local_root = ?local_root,
                enforce_overwrite_policy,
                "Starting transfer"
            );

            let summary = match execute(config, local_root, &aws, &options).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!(command = "run", error = %e, "Transfer aborted");
                    return Err(e);
                }
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

async fn execute(
    config: Option<PathBuf>,
    local_root: Option<PathBuf>,
    aws: &AwsSettings,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let location = resolve_config_location(config)?;
    let sdk = aws.load().await;
    let config_provider = config_provider(location, aws, &sdk);
    let store = S3ObjectStore::new(aws.s3_client(&sdk));

    match local_root {
        Some(root) => {
            let config = config_provider.load().await?;
            config.trace_loaded();
            let client = LocalDirClient::new(root)?;
            Ok(run_batch(&config, &client, &store, options).await)
        }
        None => {
            let secrets = SecretsManagerResolver::new(aws.secrets_client(&sdk));
            let connector = SftpConnector::new();
            let summary = invoke(
                config_provider.as_ref(),
                &secrets,
                &connector,
                &store,
                options,
            )
            .await?;
            Ok(summary)
        }
    }
}

fn config_provider(
    location: ConfigLocation,
    aws: &AwsSettings,
    sdk: &SdkConfig,
) -> Box<dyn ConfigProvider> {
    match location {
        ConfigLocation::File(path) => Box::new(FileConfigProvider::new(path)),
        ConfigLocation::Object { bucket, key } => {
            Box::new(S3ConfigProvider::new(aws.s3_client(sdk), bucket, key))
        }
    }
}
