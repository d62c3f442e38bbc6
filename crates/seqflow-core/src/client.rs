//! High-level workflow client.
//!
//! [`WorkflowClient`] ties the pieces together: it owns the transport and
//! the agent directory cache, registers definitions idempotently, and runs
//! them through the execution engine. Callers needing isolated caches
//! construct separate client instances; the cache is never shared between
//! them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor::{self, StreamEvent};
use crate::normalize::{normalize, CanonicalResult};
use crate::registrar::register_workflow;
use crate::resolver::AgentDirectory;
use crate::transport::{HttpService, WorkflowService};
use crate::workflow::Workflow;

pub struct WorkflowClient {
    service: Arc<dyn WorkflowService>,
    directory: AgentDirectory,
    config: ClientConfig,
}

impl WorkflowClient {
    /// Client talking HTTP to the server named by `config.base_url`.
    pub fn new(config: ClientConfig) -> Self {
        let service: Arc<dyn WorkflowService> = Arc::new(HttpService::new(&config));
        Self::with_service(service, config)
    }

    /// Client over an arbitrary transport (tests substitute a scripted one).
    pub fn with_service(service: Arc<dyn WorkflowService>, config: ClientConfig) -> Self {
        Self {
            service,
            directory: AgentDirectory::new(),
            config,
        }
    }

    /// True when the server answers its health endpoint.
    pub async fn check_server_health(&self) -> bool {
        self.service.health().await
    }

    /// Fresh list of agent names from the server directory.
    pub async fn available_agents(&mut self) -> Result<Vec<String>, ClientError> {
        self.directory.refresh(self.service.as_ref()).await?;
        let mut names = self.directory.known_names();
        names.sort();
        Ok(names)
    }

    /// Publish the workflow definition, replacing a stale one if needed.
    pub async fn register(&mut self, workflow: &Workflow) -> Result<(), ClientError> {
        register_workflow(
            self.service.as_ref(),
            &mut self.directory,
            workflow,
            self.config.verify_registration,
        )
        .await
    }

    /// Remove a registered workflow; absent ids are not an error.
    pub async fn unregister(&self, workflow_id: &str) -> Result<(), ClientError> {
        let status = self.service.delete_workflow(workflow_id).await?;
        if matches!(
            status,
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
        ) {
            Ok(())
        } else {
            Err(ClientError::Transport(format!(
                "delete of workflow '{}' returned HTTP {}",
                workflow_id, status
            )))
        }
    }

    /// Register and execute synchronously.
    pub async fn execute_workflow(
        &mut self,
        workflow: &Workflow,
        input_context: Option<&serde_json::Value>,
    ) -> Result<CanonicalResult, ClientError> {
        self.register(workflow).await?;
        executor::execute_sync(self.service.as_ref(), &workflow.workflow_id, input_context).await
    }

    /// Register and execute over the streaming transport; `observer`
    /// receives live progress events as they decode.
    pub async fn execute_workflow_streaming(
        &mut self,
        workflow: &Workflow,
        input_context: Option<&serde_json::Value>,
        observer: &mut dyn FnMut(StreamEvent),
    ) -> Result<CanonicalResult, ClientError> {
        self.register(workflow).await?;
        executor::execute_streaming(
            self.service.as_ref(),
            &workflow.workflow_id,
            input_context,
            observer,
        )
        .await
    }

    /// Execute an already-registered workflow synchronously.
    pub async fn execute_sync(
        &self,
        workflow_id: &str,
        input_context: Option<&serde_json::Value>,
    ) -> Result<CanonicalResult, ClientError> {
        executor::execute_sync(self.service.as_ref(), workflow_id, input_context).await
    }

    /// Execute an already-registered workflow with streaming + fallback.
    pub async fn execute_streaming(
        &self,
        workflow_id: &str,
        input_context: Option<&serde_json::Value>,
        observer: &mut dyn FnMut(StreamEvent),
    ) -> Result<CanonicalResult, ClientError> {
        executor::execute_streaming(self.service.as_ref(), workflow_id, input_context, observer)
            .await
    }

    /// Start an asynchronous execution; returns the server's execution id.
    pub async fn start_execution(
        &self,
        workflow_id: &str,
        input_context: Option<&serde_json::Value>,
    ) -> Result<String, ClientError> {
        let body = match input_context {
            Some(context) => serde_json::json!({ "input_context": context }),
            None => serde_json::json!({}),
        };
        let (status, value) = self.service.execute_async(workflow_id, &body).await?;
        if status != StatusCode::ACCEPTED {
            return Err(ClientError::ExecutionFailed {
                workflow_id: workflow_id.to_string(),
                reason: format!("execute-async returned HTTP {}", status),
            });
        }

        value
            .get("data")
            .and_then(|data| data.get("execution_id"))
            .or_else(|| value.get("execution_id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| ClientError::ExecutionFailed {
                workflow_id: workflow_id.to_string(),
                reason: "execute-async response carried no execution_id".to_string(),
            })
    }

    /// Raw status payload for a workflow, `None` if the server knows no run.
    pub async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.service.workflow_status(workflow_id).await
    }

    /// Poll the status endpoint until the run reaches a terminal state,
    /// then fetch and normalize the result.
    pub async fn wait_for_completion(
        &self,
        workflow_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<CanonicalResult, ClientError> {
        let started = Instant::now();
        loop {
            if started.elapsed() > timeout {
                return Err(ClientError::ExecutionFailed {
                    workflow_id: workflow_id.to_string(),
                    reason: format!("timed out after {:?} waiting for completion", timeout),
                });
            }

            match self.service.workflow_status(workflow_id).await? {
                Some(status) => {
                    let state = status.get("status").and_then(|v| v.as_str()).unwrap_or("");
                    tracing::debug!("workflow '{}' status: {}", workflow_id, state);
                    if matches!(state, "completed" | "failed" | "cancelled") {
                        break;
                    }
                }
                None => {
                    return Err(ClientError::ExecutionFailed {
                        workflow_id: workflow_id.to_string(),
                        reason: "status endpoint reports no such workflow".to_string(),
                    });
                }
            }

            tokio::time::sleep(poll_interval).await;
        }

        let raw = self
            .service
            .workflow_result(workflow_id)
            .await?
            .ok_or_else(|| ClientError::ExecutionFailed {
                workflow_id: workflow_id.to_string(),
                reason: "run finished but the result endpoint is empty".to_string(),
            })?;

        Ok(normalize(
            raw,
            workflow_id,
            started.elapsed().as_secs_f64() * 1000.0,
        ))
    }

    /// Raw result payload for a workflow's last run, `None` if absent.
    pub async fn workflow_result(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.service.workflow_result(workflow_id).await
    }

    /// Ask the server to cancel a running workflow.
    pub async fn cancel(&self, workflow_id: &str) -> Result<bool, ClientError> {
        let status = self.service.cancel_workflow(workflow_id).await?;
        Ok(status.is_success())
    }

    /// All registered workflow definitions.
    pub async fn list_workflows(&self) -> Result<Vec<serde_json::Value>, ClientError> {
        self.service.list_workflows().await
    }

    /// One registered definition, `None` on 404.
    pub async fn fetch_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.service.fetch_workflow(workflow_id).await
    }

    // ── Prebuilt pipelines ──────────────────────────────────────────────

    /// Research → write → review.
    pub async fn run_content_creation_workflow(
        &mut self,
        topic: &str,
        audience: &str,
    ) -> Result<CanonicalResult, ClientError> {
        let mut workflow = Workflow::new("content_creation", "Content Creation Pipeline")
            .with_description(format!("Research, write, and review content about {}", topic))
            .with_context("topic", serde_json::json!(topic))
            .with_context("audience", serde_json::json!(audience));
        workflow.add_research_step(topic);
        workflow.add_writing_step("article");
        workflow.add_review_step("accuracy, clarity, tone");

        self.execute_workflow(&workflow, None).await
    }

    /// Generate → review → document.
    pub async fn run_code_development_workflow(
        &mut self,
        requirements: &str,
        language: &str,
    ) -> Result<CanonicalResult, ClientError> {
        let mut workflow = Workflow::new("code_development", "Code Development Pipeline")
            .with_description(format!("Generate, review, and document {} code", language))
            .with_context("requirements", serde_json::json!(requirements))
            .with_context("language", serde_json::json!(language));
        workflow.add_code_generation_step(requirements, language);
        workflow.add_review_step("code quality, security, best practices");
        workflow.add(
            crate::workflow::WorkflowStep::new(
                "document",
                "content_creator",
                format!(
                    "Create comprehensive documentation for the {} code \
                     including usage examples and API reference",
                    language
                ),
            )
            .with_temperature(0.3),
        );

        self.execute_workflow(&workflow, None).await
    }

    /// Prepare → analyze → generate insights.
    pub async fn run_data_analysis_workflow(
        &mut self,
        data_description: &str,
    ) -> Result<CanonicalResult, ClientError> {
        let mut workflow = Workflow::new("data_analysis", "Data Analysis Pipeline")
            .with_description(format!("Analyze {} and generate insights", data_description))
            .with_context("data_description", serde_json::json!(data_description));
        workflow.add(
            crate::workflow::WorkflowStep::new(
                "prepare_data",
                "data_analyst",
                format!("Prepare and validate the {} for analysis", data_description),
            )
            .with_function("data_analysis")
            .with_parameter("operation", serde_json::json!("data_preparation")),
        );
        workflow.add(
            crate::workflow::WorkflowStep::new(
                "analyze",
                "data_analyst",
                "Perform statistical analysis on the prepared data",
            )
            .with_function("data_analysis")
            .with_parameter("operation", serde_json::json!("statistical_analysis")),
        );
        workflow.add(
            crate::workflow::WorkflowStep::new(
                "generate_insights",
                "research_assistant",
                "Based on the analysis results, generate key insights and \
                 actionable recommendations",
            )
            .with_temperature(0.4),
        );

        self.execute_workflow(&workflow, None).await
    }
}
