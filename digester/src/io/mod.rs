//! I/O adapters for the digest pipeline.

pub mod asset_store;
pub mod client;
pub mod config;
pub mod documents;
pub mod escalation;
pub mod process;
pub mod prompt;
pub mod retry;
pub mod run_log;
