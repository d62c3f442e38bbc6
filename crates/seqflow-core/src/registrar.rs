//! Idempotent workflow registration against a create-or-409 store.
//!
//! The backing store has no upsert: `POST` answers 201 or 409, and a 409'd
//! definition may be stale. Registration therefore runs a small bounded
//! state machine:
//!
//! 1. resolve all agent names (atomic; no network registration call is made
//!    for an unregisterable workflow)
//! 2. `POST` the resolved definition; 201 is done
//! 3. on 409, `DELETE` the id (200/204/404 all mean "now absent") and
//!    `POST` exactly once more
//! 4. anything else is a hard [`ClientError::RegistrationFailed`]; a second
//!    failure after cleanup means the server is broken, not busy, so there
//!    is never a third attempt
//!
//! Registration runs once per execution call and is never cached across
//! calls: the server's store may have been cleared externally in between.

use reqwest::StatusCode;

use crate::error::ClientError;
use crate::resolver::AgentDirectory;
use crate::transport::WorkflowService;
use crate::workflow::Workflow;

/// Statuses after which the workflow id is known to be absent.
fn is_deleted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
    )
}

/// Publish `workflow` under its id, replacing any stale definition.
///
/// With `verify` set, a reported success is re-checked with a GET and a 404
/// there fails the registration anyway (tolerates eventually-consistent or
/// buggy backends).
pub async fn register_workflow(
    service: &dyn WorkflowService,
    directory: &mut AgentDirectory,
    workflow: &Workflow,
    verify: bool,
) -> Result<(), ClientError> {
    workflow.validate()?;

    let names = workflow.agent_names();
    let resolved = directory
        .resolve_all(service, &names)
        .await
        .map_err(|e| match e {
            ClientError::AgentNotFound(agent_name) => ClientError::UnresolvedAgent {
                workflow_id: workflow.workflow_id.clone(),
                agent_name,
            },
            other => other,
        })?;

    let definition = workflow.to_wire(&resolved)?;
    let workflow_id = &workflow.workflow_id;

    let status = service.create_workflow(&definition).await?;
    match status {
        StatusCode::CREATED => {
            tracing::info!("workflow '{}' registered", workflow_id);
        }
        StatusCode::CONFLICT => {
            tracing::debug!("workflow '{}' already exists, replacing", workflow_id);

            let deleted = service.delete_workflow(workflow_id).await?;
            if !is_deleted(deleted) {
                return Err(ClientError::RegistrationFailed {
                    workflow_id: workflow_id.clone(),
                    reason: format!("cleanup delete returned HTTP {}", deleted),
                });
            }

            let retried = service.create_workflow(&definition).await?;
            if retried != StatusCode::CREATED {
                return Err(ClientError::RegistrationFailed {
                    workflow_id: workflow_id.clone(),
                    reason: format!("re-create after cleanup returned HTTP {}", retried),
                });
            }
            tracing::info!("workflow '{}' re-registered after cleanup", workflow_id);
        }
        other => {
            return Err(ClientError::RegistrationFailed {
                workflow_id: workflow_id.clone(),
                reason: format!("create returned HTTP {}", other),
            });
        }
    }

    if verify && service.fetch_workflow(workflow_id).await?.is_none() {
        return Err(ClientError::RegistrationFailed {
            workflow_id: workflow_id.clone(),
            reason: "registration reported success but the workflow is absent".to_string(),
        });
    }

    Ok(())
}
