//! Seqflow core — client-side orchestration for a remote sequential-workflow
//! execution service.
//!
//! The server runs pipelines of named agent steps; this crate makes driving
//! it reliable:
//!
//! - **Workflow model** ([`workflow`]) — in-memory pipeline description and
//!   YAML loading; no I/O.
//! - **Agent name resolver** ([`resolver`]) — maps human-readable agent
//!   names to the server's volatile ids through a process-local cache.
//! - **Workflow registrar** ([`registrar`]) — makes "define this workflow"
//!   idempotent against a create-or-409 store.
//! - **Execution engine** ([`executor`]) — synchronous and SSE-streaming
//!   strategies chained by a bounded fallback coordinator.
//! - **Result normalizer** ([`normalize`]) — one canonical result shape
//!   regardless of transport or server response envelope.
//!
//! [`client::WorkflowClient`] is the facade most callers want.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod registrar;
pub mod resolver;
pub mod transport;
pub mod workflow;

// Convenience re-exports
pub use client::WorkflowClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use executor::StreamEvent;
pub use normalize::{CanonicalResult, StepOutcome};
pub use workflow::{Workflow, WorkflowStep};
