//! Workflow model — in-memory description of a sequential pipeline.
//!
//! A workflow is built fluently in code or loaded from a YAML file, then
//! published to the server by the registrar and run by the execution engine:
//!
//! ```text
//! workflow.yaml ──► Workflow ──► register_workflow (agent names → ids)
//!      or                              │
//! Workflow::new() + add_step()    execute engine (sync / streaming)
//!                                      │
//!                                 CanonicalResult
//! ```
//!
//! The model itself does no I/O and never stores raw remote agent ids;
//! names are substituted only when the wire form is produced.

pub mod schema;

pub use schema::{Workflow, WorkflowStep};
