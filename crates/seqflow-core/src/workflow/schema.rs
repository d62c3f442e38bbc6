//! Workflow and step definitions.
//!
//! A workflow YAML defines a named sequential pipeline:
//!
//! ```yaml
//! workflow_id: "content_creation"
//! workflow_name: "Content Creation Pipeline"
//! description: "Research, write, and review content in sequential steps"
//! stop_on_failure: true
//!
//! global_context:
//!   topic: "The Future of AI in Healthcare"
//!   audience: "healthcare professionals"
//!
//! steps:
//!   - step_id: "research"
//!     agent_name: "research_assistant"
//!     prompt: "Research the latest information about the topic."
//!     temperature: 0.3
//!     max_tokens: 1200
//!
//!   - step_id: "write_content"
//!     agent_name: "content_creator"
//!     prompt: "Based on the research, write a professional article."
//! ```
//!
//! `agent_name` is always a human-readable name; the server's volatile
//! agent ids are substituted only in [`Workflow::to_wire`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A single step in the workflow pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within the workflow; results are keyed by this id.
    pub step_id: String,

    /// Human-readable worker reference, resolved at registration time.
    pub agent_name: String,

    /// Payload forwarded to the worker.
    pub prompt: String,

    /// Operation to invoke on the worker.
    #[serde(default = "default_function_name")]
    pub function_name: String,

    /// Per-step timeout, enforced server-side.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Per-step retry budget, enforced server-side.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Sampling temperature for inference steps.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Token budget for inference steps.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extra function parameters, merged over the generated ones.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

fn default_function_name() -> String {
    "inference".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl WorkflowStep {
    /// Step with the given identity and prompt, all knobs defaulted.
    pub fn new(
        step_id: impl Into<String>,
        agent_name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            agent_name: agent_name.into(),
            prompt: prompt.into(),
            function_name: default_function_name(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_function(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = function_name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Server wire form with the resolved agent id substituted in.
    pub fn to_wire(&self, agent_id: &str) -> serde_json::Value {
        let mut parameters = serde_json::json!({
            "prompt": self.prompt,
            "model": "default",
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        for (key, value) in &self.parameters {
            parameters[key] = value.clone();
        }

        serde_json::json!({
            "step_id": self.step_id,
            "step_name": title_case(&self.step_id),
            "description": format!("Execute {} using {}", self.function_name, self.agent_name),
            "agent_id": agent_id,
            "function_name": self.function_name,
            "timeout_seconds": self.timeout_seconds,
            "max_retries": self.max_retries,
            "continue_on_failure": false,
            "parameters": parameters,
        })
    }
}

/// An ordered, named pipeline of steps.
///
/// Mutable only until registered; a definition change after registration
/// requires re-registration (the registrar handles delete + recreate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Caller-chosen id, globally unique on the server; the idempotency key.
    pub workflow_id: String,

    pub workflow_name: String,

    #[serde(default)]
    pub description: String,

    /// Ordered steps; order is execution order.
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,

    /// Key/value data shared across steps.
    #[serde(default)]
    pub global_context: HashMap<String, serde_json::Value>,

    /// Whether a failed step halts the pipeline.
    #[serde(default = "default_stop_on_failure")]
    pub stop_on_failure: bool,

    /// Overall budget, enforced server-side.
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time_seconds: u64,
}

fn default_stop_on_failure() -> bool {
    true
}

fn default_max_execution_time() -> u64 {
    300
}

impl Workflow {
    pub fn new(workflow_id: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        let workflow_name = workflow_name.into();
        Self {
            workflow_id: workflow_id.into(),
            description: format!("Custom workflow: {}", workflow_name),
            workflow_name,
            steps: Vec::new(),
            global_context: HashMap::new(),
            stop_on_failure: true,
            max_execution_time_seconds: default_max_execution_time(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.global_context.insert(key.into(), value);
        self
    }

    /// Append a step built elsewhere.
    pub fn add(&mut self, step: WorkflowStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Append a plain inference step.
    pub fn add_step(
        &mut self,
        step_id: impl Into<String>,
        agent_name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> &mut Self {
        self.add(WorkflowStep::new(step_id, agent_name, prompt))
    }

    /// Research step template.
    pub fn add_research_step(&mut self, topic: &str) -> &mut Self {
        self.add(
            WorkflowStep::new(
                "research",
                "research_assistant",
                format!(
                    "Research the latest information about: {}. \
                     Provide comprehensive and accurate information.",
                    topic
                ),
            )
            .with_temperature(0.3)
            .with_max_tokens(1200),
        )
    }

    /// Content writing step template.
    pub fn add_writing_step(&mut self, content_type: &str) -> &mut Self {
        self.add(
            WorkflowStep::new(
                "write_content",
                "content_creator",
                format!(
                    "Based on the research, write a professional {}. \
                     Make it engaging and well-structured.",
                    content_type
                ),
            )
            .with_max_tokens(1500),
        )
    }

    /// Quality review step template.
    pub fn add_review_step(&mut self, criteria: &str) -> &mut Self {
        self.add(
            WorkflowStep::new(
                "review",
                "qa_specialist",
                format!(
                    "Review the content for: {}. \
                     Provide constructive feedback and suggestions.",
                    criteria
                ),
            )
            .with_function("text_processing")
            .with_parameter("operation", serde_json::json!("quality_review"))
            .with_parameter("criteria", serde_json::json!(criteria)),
        )
    }

    /// Code generation step template.
    pub fn add_code_generation_step(&mut self, requirements: &str, language: &str) -> &mut Self {
        self.add(
            WorkflowStep::new(
                "generate_code",
                "code_assistant",
                format!(
                    "Generate {} code for: {}. \
                     Include proper error handling and documentation.",
                    language, requirements
                ),
            )
            .with_temperature(0.2)
            .with_max_tokens(1500),
        )
    }

    /// All distinct agent names referenced by the steps, in first-use order.
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !names.contains(&step.agent_name.as_str()) {
                names.push(&step.agent_name);
            }
        }
        names
    }

    /// Check structural invariants (unique step ids, non-empty ids).
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.workflow_id.is_empty() {
            return Err(ClientError::InvalidWorkflow(
                "workflow_id must not be empty".to_string(),
            ));
        }
        let mut seen: Vec<&str> = Vec::new();
        for step in &self.steps {
            if step.step_id.is_empty() {
                return Err(ClientError::InvalidWorkflow(format!(
                    "workflow '{}' contains a step with an empty step_id",
                    self.workflow_id
                )));
            }
            if seen.contains(&step.step_id.as_str()) {
                return Err(ClientError::InvalidWorkflow(format!(
                    "duplicate step_id '{}' in workflow '{}'",
                    step.step_id, self.workflow_id
                )));
            }
            seen.push(&step.step_id);
        }
        Ok(())
    }

    /// Server wire form with every agent name replaced by its resolved id.
    ///
    /// `resolved` must cover every referenced name; the registrar resolves
    /// atomically before calling this, so a miss here means a caller bug.
    pub fn to_wire(
        &self,
        resolved: &HashMap<String, String>,
    ) -> Result<serde_json::Value, ClientError> {
        let mut wire_steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let agent_id = resolved.get(&step.agent_name).ok_or_else(|| {
                ClientError::UnresolvedAgent {
                    workflow_id: self.workflow_id.clone(),
                    agent_name: step.agent_name.clone(),
                }
            })?;
            wire_steps.push(step.to_wire(agent_id));
        }

        Ok(serde_json::json!({
            "workflow_id": self.workflow_id,
            "workflow_name": self.workflow_name,
            "description": self.description,
            "stop_on_failure": self.stop_on_failure,
            "max_execution_time_seconds": self.max_execution_time_seconds,
            "global_context": self.global_context,
            "steps": wire_steps,
        }))
    }

    /// Parse a workflow definition from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ClientError> {
        let workflow: Workflow = serde_yaml::from_str(yaml)
            .map_err(|e| ClientError::InvalidWorkflow(format!("failed to parse YAML: {}", e)))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Load a workflow definition from a file path.
    pub fn from_file(path: &str) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidWorkflow(format!("failed to read workflow file '{}': {}", path, e))
        })?;
        Self::from_yaml(&content)
    }
}

/// `generate_code` -> `Generate Code`.
fn title_case(step_id: &str) -> String {
    step_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wire_form_substitutes_agent_id() {
        let step = WorkflowStep::new("s1", "writer", "do X");
        let wire = step.to_wire("abc-123");

        assert_eq!(wire["step_id"], "s1");
        assert_eq!(wire["agent_id"], "abc-123");
        assert_eq!(wire["function_name"], "inference");
        assert_eq!(wire["continue_on_failure"], false);
        assert_eq!(wire["parameters"]["prompt"], "do X");
        assert_eq!(wire["parameters"]["model"], "default");
    }

    #[test]
    fn test_step_parameters_override_generated_ones() {
        let step = WorkflowStep::new("review", "qa_specialist", "check it")
            .with_function("text_processing")
            .with_parameter("operation", serde_json::json!("quality_review"))
            .with_parameter("max_tokens", serde_json::json!(42));
        let wire = step.to_wire("id-1");

        assert_eq!(wire["function_name"], "text_processing");
        assert_eq!(wire["parameters"]["operation"], "quality_review");
        assert_eq!(wire["parameters"]["max_tokens"], 42);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("generate_code"), "Generate Code");
        assert_eq!(title_case("research"), "Research");
        assert_eq!(title_case("qa__testing"), "Qa Testing");
    }

    #[test]
    fn test_workflow_wire_form() {
        let mut workflow = Workflow::new("w1", "Test Pipeline");
        workflow.add_step("s1", "writer", "do X");

        let resolved = HashMap::from([("writer".to_string(), "abc-123".to_string())]);
        let wire = workflow.to_wire(&resolved).unwrap();

        assert_eq!(wire["workflow_id"], "w1");
        assert_eq!(wire["stop_on_failure"], true);
        assert_eq!(wire["steps"][0]["step_id"], "s1");
        assert_eq!(wire["steps"][0]["agent_id"], "abc-123");
    }

    #[test]
    fn test_wire_form_fails_on_unresolved_agent() {
        let mut workflow = Workflow::new("w1", "Test Pipeline");
        workflow.add_step("s1", "ghost", "do X");

        let err = workflow.to_wire(&HashMap::new()).unwrap_err();
        match err {
            ClientError::UnresolvedAgent {
                workflow_id,
                agent_name,
            } => {
                assert_eq!(workflow_id, "w1");
                assert_eq!(agent_name, "ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_step_ids_rejected() {
        let mut workflow = Workflow::new("w1", "Test Pipeline");
        workflow.add_step("s1", "writer", "one");
        workflow.add_step("s1", "writer", "two");

        assert!(matches!(
            workflow.validate(),
            Err(ClientError::InvalidWorkflow(_))
        ));
    }

    #[test]
    fn test_agent_names_deduplicated_in_order() {
        let mut workflow = Workflow::new("w1", "Test Pipeline");
        workflow.add_step("a", "writer", "one");
        workflow.add_step("b", "reviewer", "two");
        workflow.add_step("c", "writer", "three");

        assert_eq!(workflow.agent_names(), vec!["writer", "reviewer"]);
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
workflow_id: "w1"
workflow_name: "Test Flow"
steps:
  - step_id: "s1"
    agent_name: "writer"
    prompt: "Hello, world!"
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(workflow.workflow_id, "w1");
        assert_eq!(workflow.steps.len(), 1);
        assert_eq!(workflow.steps[0].function_name, "inference");
        assert_eq!(workflow.steps[0].timeout_seconds, 60);
        assert!(workflow.stop_on_failure);
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
workflow_id: "content_creation"
workflow_name: "Content Creation Pipeline"
description: "Research, write, review"
stop_on_failure: false
max_execution_time_seconds: 600
global_context:
  topic: "AI in Healthcare"
steps:
  - step_id: "research"
    agent_name: "research_assistant"
    prompt: "Research the topic"
    temperature: 0.3
    max_tokens: 1200
  - step_id: "review"
    agent_name: "qa_specialist"
    prompt: "Review it"
    function_name: "text_processing"
    parameters:
      operation: "quality_review"
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(workflow.steps.len(), 2);
        assert!(!workflow.stop_on_failure);
        assert_eq!(workflow.max_execution_time_seconds, 600);
        assert_eq!(workflow.global_context["topic"], "AI in Healthcare");
        assert_eq!(workflow.steps[1].function_name, "text_processing");
        assert_eq!(
            workflow.steps[1].parameters["operation"],
            serde_json::json!("quality_review")
        );
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
workflow_id: "w1"
workflow_name: "File Flow"
steps:
  - step_id: "s1"
    agent_name: "writer"
    prompt: "hello"
"#
        )
        .unwrap();

        let workflow = Workflow::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(workflow.workflow_name, "File Flow");

        assert!(Workflow::from_file("/nonexistent/workflow.yaml").is_err());
    }

    #[test]
    fn test_yaml_with_duplicate_steps_rejected() {
        let yaml = r#"
workflow_id: "w1"
workflow_name: "Bad Flow"
steps:
  - step_id: "s1"
    agent_name: "writer"
    prompt: "one"
  - step_id: "s1"
    agent_name: "writer"
    prompt: "two"
"#;
        assert!(Workflow::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_template_steps() {
        let mut workflow = Workflow::new("content", "Content Pipeline");
        workflow.add_research_step("quantum computing");
        workflow.add_writing_step("article");
        workflow.add_review_step("accuracy, clarity");

        assert_eq!(workflow.steps.len(), 3);
        assert_eq!(workflow.steps[0].agent_name, "research_assistant");
        assert!((workflow.steps[0].temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(workflow.steps[2].function_name, "text_processing");
        assert_eq!(
            workflow.agent_names(),
            vec!["research_assistant", "content_creator", "qa_specialist"]
        );
    }
}
