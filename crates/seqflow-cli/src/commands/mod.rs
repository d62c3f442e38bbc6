//! CLI command implementations.
//!
//! Each command takes the shared [`WorkflowClient`] and returns
//! `Result<(), String>`; `main` prints the error and sets the exit code.

pub mod agents;
pub mod run;
pub mod workflows;

use std::time::Duration;

use seqflow_core::{ClientConfig, WorkflowClient};

/// Build the client from the global CLI flags.
pub fn init_client(base_url: &str, timeout_secs: u64) -> WorkflowClient {
    let config = ClientConfig::new(base_url).with_timeout(Duration::from_secs(timeout_secs));
    WorkflowClient::new(config)
}
