//! `seqflow run` / `seqflow validate` — execute or check a workflow file.

use std::io::Write;

use seqflow_core::executor::StreamEvent;
use seqflow_core::{CanonicalResult, Workflow, WorkflowClient};

/// Run a workflow from a YAML file.
pub async fn run(
    client: &mut WorkflowClient,
    workflow_file: &str,
    stream: bool,
    context: Option<&str>,
    id_override: Option<&str>,
    verbose: bool,
) -> Result<(), String> {
    let mut workflow = Workflow::from_file(workflow_file).map_err(|e| e.to_string())?;
    if let Some(id) = id_override {
        workflow.workflow_id = id.to_string();
    }

    let input_context = context
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| format!("invalid --context JSON: {}", e))?;

    println!(
        "📄 Loaded workflow: {} ({})",
        workflow.workflow_name, workflow_file
    );
    println!(
        "   id: {}, {} step(s)",
        workflow.workflow_id,
        workflow.steps.len()
    );
    println!();

    let result = if stream {
        println!("🌊 Streaming execution:");
        let mut observer = |event: StreamEvent| match event {
            StreamEvent::StepStarted {
                step_id,
                agent_name,
            } => {
                println!();
                match agent_name {
                    Some(agent) => println!("── {} ({}) ──", step_id, agent),
                    None => println!("── {} ──", step_id),
                }
            }
            StreamEvent::Output { text, .. } => {
                print!("{}", text);
                std::io::stdout().flush().ok();
            }
            StreamEvent::StepCompleted {
                step_id,
                success,
                error,
            } => {
                println!();
                if success {
                    println!("   ✅ {} completed", step_id);
                } else {
                    println!(
                        "   ❌ {} failed: {}",
                        step_id,
                        error.as_deref().unwrap_or("unknown")
                    );
                }
            }
            StreamEvent::ErrorReported { message } => {
                println!();
                println!("   ❌ {}", message);
            }
        };
        client
            .execute_workflow_streaming(&workflow, input_context.as_ref(), &mut observer)
            .await
    } else {
        client
            .execute_workflow(&workflow, input_context.as_ref())
            .await
    }
    .map_err(|e| e.to_string())?;

    println!();
    print_result(&result, verbose);

    if result.success {
        Ok(())
    } else {
        let failed: Vec<&str> = result
            .step_results
            .iter()
            .filter(|(_, step)| !step.success)
            .map(|(step_id, _)| step_id.as_str())
            .collect();
        Err(format!("workflow failed. Failed steps: {}", failed.join(", ")))
    }
}

/// Validate a workflow YAML file without executing it.
pub async fn validate(workflow_file: &str) -> Result<(), String> {
    let workflow = Workflow::from_file(workflow_file).map_err(|e| e.to_string())?;

    println!("✅ Workflow '{}' is valid", workflow.workflow_name);
    println!("   id: {}", workflow.workflow_id);
    println!("   stop_on_failure: {}", workflow.stop_on_failure);
    println!("   steps: {}", workflow.steps.len());

    for (i, step) in workflow.steps.iter().enumerate() {
        println!(
            "   {}. {} (agent: {}, function: {})",
            i + 1,
            step.step_id,
            step.agent_name,
            step.function_name
        );
    }

    Ok(())
}

fn print_result(result: &CanonicalResult, verbose: bool) {
    println!("═══════════════════════════════════════════════════════════");
    println!("  Workflow: {}", result.workflow_id);
    println!(
        "  Status: {}",
        if result.success {
            "✅ SUCCESS"
        } else {
            "❌ FAILED"
        }
    );
    println!(
        "  Steps: {}/{} succeeded",
        result
            .step_results
            .values()
            .filter(|step| step.success)
            .count(),
        result.step_results.len()
    );
    println!(
        "  Total execution time: {:.2}ms",
        result.total_execution_time_ms
    );
    println!("  Finished at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    if verbose {
        for (step_id, step) in &result.step_results {
            let icon = if step.success { "✅" } else { "❌" };
            println!();
            println!("  {} {}", icon, step_id);
            if let Some(error) = &step.error {
                println!("     error: {}", error);
            }
            for line in step.output.lines().take(8) {
                println!("     │ {}", line);
            }
        }
    }

    if !result.final_output.is_empty() {
        println!();
        println!("  Final output:");
        for line in result.final_output.lines() {
            println!("  │ {}", line);
        }
    }
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    #[tokio::test]
    async fn test_validate_accepts_a_well_formed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
workflow_id: "w1"
workflow_name: "Test Flow"
steps:
  - step_id: "s1"
    agent_name: "writer"
    prompt: "hello"
"#
        )
        .unwrap();

        super::validate(file.path().to_str().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_rejects_duplicate_step_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
workflow_id: "w1"
workflow_name: "Bad Flow"
steps:
  - step_id: "s1"
    agent_name: "writer"
    prompt: "one"
  - step_id: "s1"
    agent_name: "writer"
    prompt: "two"
"#
        )
        .unwrap();

        assert!(super::validate(file.path().to_str().unwrap()).await.is_err());
    }
}
