//! HTTP transport for the sequential-workflow service.
//!
//! [`WorkflowService`] is the seam between the orchestration logic and the
//! wire: production code goes through [`HttpService`] (reqwest), tests
//! substitute a scripted in-memory implementation. The trait deliberately
//! exposes raw status codes where the protocol logic (registrar, engine)
//! needs to branch on them.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// One entry of the server's agent directory.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
}

/// Response to an execute call made with `Accept: text/event-stream`.
///
/// The server may silently degrade to a plain JSON body; the engine decides
/// based on `content_type` whether to run the SSE state machine or to parse
/// the collected lines as one document.
pub struct StreamResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub lines: BoxStream<'static, Result<String, ClientError>>,
}

#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// True when the server answers its health endpoint.
    async fn health(&self) -> bool;

    /// `GET /api/v1/agents` — the agent directory.
    async fn list_agents(&self) -> Result<Vec<AgentInfo>, ClientError>;

    /// `POST /api/v1/sequential-workflows` with a resolved definition.
    /// 201 = created, 409 = already exists; anything else is the caller's
    /// problem to classify.
    async fn create_workflow(
        &self,
        definition: &serde_json::Value,
    ) -> Result<StatusCode, ClientError>;

    /// `DELETE /api/v1/sequential-workflows/{id}`.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<StatusCode, ClientError>;

    /// `GET /api/v1/sequential-workflows/{id}`; `None` on 404.
    async fn fetch_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError>;

    /// `GET /api/v1/sequential-workflows` — all registered definitions.
    async fn list_workflows(&self) -> Result<Vec<serde_json::Value>, ClientError>;

    /// `POST /api/v1/sequential-workflows/{id}/execute`, `Accept: application/json`.
    async fn execute_sync(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<(StatusCode, serde_json::Value), ClientError>;

    /// `POST /api/v1/sequential-workflows/{id}/execute`, `Accept: text/event-stream`.
    async fn execute_stream(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<StreamResponse, ClientError>;

    /// `POST /api/v1/sequential-workflows/{id}/execute-async`; 202 expected.
    async fn execute_async(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<(StatusCode, serde_json::Value), ClientError>;

    /// `GET /api/v1/sequential-workflows/{id}/status`; `None` on 404.
    async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError>;

    /// `GET /api/v1/sequential-workflows/{id}/result`; `None` on 404.
    async fn workflow_result(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError>;

    /// `POST /api/v1/sequential-workflows/{id}/cancel`.
    async fn cancel_workflow(&self, workflow_id: &str) -> Result<StatusCode, ClientError>;
}

/// Production transport over reqwest.
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_optional(&self, path: &str) -> Result<Option<serde_json::Value>, ClientError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "GET {} returned HTTP {}",
                path, status
            )));
        }
        let body: serde_json::Value = response.json().await?;
        Ok(Some(crate::normalize::unwrap_data(body)))
    }
}

#[async_trait]
impl WorkflowService for HttpService {
    async fn health(&self) -> bool {
        // Newer servers answer /v1/health, older ones /health.
        for path in ["/v1/health", "/health"] {
            match self.client.get(self.url(path)).send().await {
                Ok(response) if response.status().is_success() => return true,
                Ok(response) => {
                    tracing::debug!("health check {} returned HTTP {}", path, response.status());
                }
                Err(e) => {
                    tracing::debug!("health check {} failed: {}", path, e);
                }
            }
        }
        false
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, ClientError> {
        let response = self.client.get(self.url("/api/v1/agents")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "agent directory returned HTTP {}",
                status
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let entries = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        // Skip malformed entries instead of failing the whole directory.
        let agents: Vec<AgentInfo> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        tracing::debug!("agent directory returned {} agents", agents.len());
        Ok(agents)
    }

    async fn create_workflow(
        &self,
        definition: &serde_json::Value,
    ) -> Result<StatusCode, ClientError> {
        let response = self
            .client
            .post(self.url("/api/v1/sequential-workflows"))
            .header(CONTENT_TYPE, "application/json")
            .json(definition)
            .send()
            .await?;
        Ok(response.status())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<StatusCode, ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/v1/sequential-workflows/{}", workflow_id)))
            .send()
            .await?;
        Ok(response.status())
    }

    async fn fetch_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.get_optional(&format!("/api/v1/sequential-workflows/{}", workflow_id))
            .await
    }

    async fn list_workflows(&self) -> Result<Vec<serde_json::Value>, ClientError> {
        let listed = self.get_optional("/api/v1/sequential-workflows").await?;
        Ok(listed
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default())
    }

    async fn execute_sync(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<(StatusCode, serde_json::Value), ClientError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/v1/sequential-workflows/{}/execute",
                workflow_id
            )))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok((status, value))
    }

    async fn execute_stream(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<StreamResponse, ClientError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/v1/sequential-workflows/{}/execute",
                workflow_id
            )))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut bytes = response.bytes_stream();
        let lines: BoxStream<'static, Result<String, ClientError>> =
            Box::pin(async_stream::stream! {
                let mut buffer = String::new();
                while let Some(chunk) = bytes.next().await {
                    match chunk {
                        Ok(chunk) => {
                            buffer.push_str(&String::from_utf8_lossy(&chunk));
                            while let Some(pos) = buffer.find('\n') {
                                let line = buffer[..pos].trim_end_matches('\r').to_string();
                                buffer.drain(..=pos);
                                yield Ok(line);
                            }
                        }
                        Err(e) => {
                            yield Err(ClientError::from(e));
                            return;
                        }
                    }
                }
                if !buffer.is_empty() {
                    yield Ok(std::mem::take(&mut buffer));
                }
            });

        Ok(StreamResponse {
            status,
            content_type,
            lines,
        })
    }

    async fn execute_async(
        &self,
        workflow_id: &str,
        body: &serde_json::Value,
    ) -> Result<(StatusCode, serde_json::Value), ClientError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/v1/sequential-workflows/{}/execute-async",
                workflow_id
            )))
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok((status, value))
    }

    async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.get_optional(&format!(
            "/api/v1/sequential-workflows/{}/status",
            workflow_id
        ))
        .await
    }

    async fn workflow_result(
        &self,
        workflow_id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.get_optional(&format!(
            "/api/v1/sequential-workflows/{}/result",
            workflow_id
        ))
        .await
    }

    async fn cancel_workflow(&self, workflow_id: &str) -> Result<StatusCode, ClientError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/v1/sequential-workflows/{}/cancel",
                workflow_id
            )))
            .send()
            .await?;
        Ok(response.status())
    }
}
