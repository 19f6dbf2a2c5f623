pub mod aws;
pub mod cli;
pub mod load_config;
pub mod logging;
pub mod s3;
pub mod secrets;
pub mod sftp;

pub use cli::{run, Cli, Commands};
