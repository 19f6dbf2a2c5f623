#![doc = "sftp-bucket-core: core logic library for sftp-bucket."]

//! This crate holds the transfer orchestration and everything it depends on
//! through traits only: rule matching, destination naming, the result summary
//! and the fatal/per-file error taxonomy. Concrete SFTP and cloud adapters live
//! in the `sftp-bucket` crate.
//!
//! # Usage
//! Build a [`config::Config`], connect a [`contract::RemoteFileClient`] and call
//! [`transfer::run_batch`], or wire all collaborators through
//! [`invocation::invoke`].

pub mod config;
pub mod contract;
pub mod credential;
pub mod destination;
pub mod error;
pub mod invocation;
pub mod local;
pub mod rules;
pub mod summary;
pub mod transfer;
