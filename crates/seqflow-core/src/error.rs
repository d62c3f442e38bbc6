//! Core error type for the seqflow client.
//!
//! Every failure surfaced to a caller is one of these variants, so callers
//! can decide per-kind whether a retry of the whole operation makes sense.
//! Transport-shape inconsistencies and content-type downgrades are absorbed
//! inside the engine and never reach this type.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The agent name is absent from the server directory, even after a
    /// fresh fetch. Not retryable; the caller named a worker that does not
    /// exist.
    #[error("Agent not found in server directory: {0}")]
    AgentNotFound(String),

    /// A workflow references an agent name that could not be resolved.
    /// Raised before any registration call is made.
    #[error("Workflow '{workflow_id}' references unknown agent '{agent_name}'")]
    UnresolvedAgent {
        workflow_id: String,
        agent_name: String,
    },

    /// The create / 409-cleanup / re-create sequence was exhausted.
    #[error("Failed to register workflow '{workflow_id}': {reason}")]
    RegistrationFailed {
        workflow_id: String,
        reason: String,
    },

    /// Every execution strategy (streaming, result poll, synchronous) failed.
    #[error("Execution of workflow '{workflow_id}' failed: {reason}")]
    ExecutionFailed {
        workflow_id: String,
        reason: String,
    },

    /// The workflow definition itself is malformed (duplicate step ids,
    /// unparsable YAML, ...). Caught client-side.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// Wire-level failure: connect, send, or body read.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
