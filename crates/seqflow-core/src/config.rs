//! Client configuration.

use std::time::Duration;

/// Configuration for a [`crate::client::WorkflowClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the workflow server, e.g. `http://localhost:8080`.
    pub base_url: String,

    /// Per-request timeout. Also bounds the lifetime of a streaming
    /// response body, so keep it above the longest expected workflow.
    pub request_timeout: Duration,

    /// When true, a successful registration is re-checked with a GET; a 404
    /// there fails the registration even though the POST reported success.
    /// Off by default (the canonical 409 path then costs exactly 3 calls).
    pub verify_registration: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(300),
            verify_registration: false,
        }
    }
}

impl ClientConfig {
    /// Config pointing at the given base URL, other fields defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_registration = verify;
        self
    }
}
