use anyhow::Result;
use clap::Parser;
use sftp_bucket::cli::{run, Cli};
use sftp_bucket::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("sftp-bucket completed"),
        Err(e) => tracing::error!(error = %e, "sftp-bucket exited with error"),
    }
    result
}
