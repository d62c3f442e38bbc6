//! `seqflow agents` / `seqflow health` — server directory and liveness.

use seqflow_core::WorkflowClient;

/// List the agent names the server currently offers.
pub async fn list(client: &mut WorkflowClient) -> Result<(), String> {
    let agents = client.available_agents().await.map_err(|e| e.to_string())?;

    if agents.is_empty() {
        println!("⚠️  No agents available on the server");
        return Ok(());
    }

    println!("📊 Available agents:");
    for agent in &agents {
        println!("  • {}", agent);
    }
    println!();
    println!("{} agent(s) ready for use", agents.len());
    Ok(())
}

/// Check whether the server answers its health endpoint.
pub async fn health(client: &WorkflowClient) -> Result<(), String> {
    if client.check_server_health().await {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err("server did not answer its health endpoint".to_string())
    }
}
