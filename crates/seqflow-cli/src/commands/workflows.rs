//! `seqflow list` / `status` / `result` / `cancel` / `unregister` —
//! management of workflows already registered on the server.

use seqflow_core::normalize::normalize;
use seqflow_core::WorkflowClient;

/// List all workflows registered on the server.
pub async fn list(client: &WorkflowClient) -> Result<(), String> {
    let workflows = client.list_workflows().await.map_err(|e| e.to_string())?;

    if workflows.is_empty() {
        println!("No workflows registered");
        return Ok(());
    }

    println!("📋 Registered workflows:");
    for workflow in &workflows {
        let id = workflow
            .get("workflow_id")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let name = workflow
            .get("workflow_name")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let steps = workflow
            .get("steps")
            .and_then(|v| v.as_array())
            .map(|steps| steps.len())
            .unwrap_or(0);
        println!("  • {} — {} ({} step(s))", id, name, steps);
    }
    Ok(())
}

/// Show the execution status of a workflow.
pub async fn status(client: &WorkflowClient, workflow_id: &str) -> Result<(), String> {
    match client
        .workflow_status(workflow_id)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(status) => {
            let state = status.get("status").and_then(|v| v.as_str()).unwrap_or("unknown");
            println!("📊 Workflow '{}': {}", workflow_id, state);
            if let (Some(done), Some(total)) = (
                status.get("completed_steps").and_then(|v| v.as_u64()),
                status.get("total_steps").and_then(|v| v.as_u64()),
            ) {
                println!("   progress: {}/{} steps", done, total);
            }
            Ok(())
        }
        None => Err(format!("no status for workflow '{}'", workflow_id)),
    }
}

/// Fetch and display the last execution result of a workflow.
pub async fn result(client: &WorkflowClient, workflow_id: &str) -> Result<(), String> {
    match client
        .workflow_result(workflow_id)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(raw) => {
            let result = normalize(raw, workflow_id, 0.0);
            println!(
                "📋 Workflow '{}': {}",
                result.workflow_id,
                if result.success { "✅ SUCCESS" } else { "❌ FAILED" }
            );
            for (step_id, step) in &result.step_results {
                let icon = if step.success { "✅" } else { "❌" };
                println!("  {} {}", icon, step_id);
            }
            if !result.final_output.is_empty() {
                println!();
                println!("{}", result.final_output);
            }
            Ok(())
        }
        None => Err(format!("no result for workflow '{}'", workflow_id)),
    }
}

/// Ask the server to cancel a running workflow.
pub async fn cancel(client: &WorkflowClient, workflow_id: &str) -> Result<(), String> {
    if client
        .cancel(workflow_id)
        .await
        .map_err(|e| e.to_string())?
    {
        println!("🛑 Cancel requested for workflow '{}'", workflow_id);
        Ok(())
    } else {
        Err(format!("server refused to cancel workflow '{}'", workflow_id))
    }
}

/// Remove a registered workflow definition.
pub async fn unregister(client: &WorkflowClient, workflow_id: &str) -> Result<(), String> {
    client
        .unregister(workflow_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("🗑  Workflow '{}' removed", workflow_id);
    Ok(())
}
