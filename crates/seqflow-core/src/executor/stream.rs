//! SSE stream parsing — an explicit state machine over `data:`-framed lines.
//!
//! The parser is pure: the engine feeds it one decoded line at a time and
//! forwards the returned events to the caller's observer immediately, so
//! live output is flushed within one network read of being produced. The
//! machine has three states:
//!
//! ```text
//! AwaitingStep ──step_start──► InStep ──step_complete──► AwaitingStep
//!       │                        │
//!       └──────workflow_complete─┴──────► Done
//! ```
//!
//! Token events append to the active step's buffer; a `data:` payload that
//! is not JSON is a raw text token and is never dropped.

use indexmap::IndexMap;

/// Incremental event decoded from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    StepStarted {
        step_id: String,
        agent_name: Option<String>,
    },
    /// A fragment of live output. `step_id` is `None` when the server sent
    /// output outside any announced step.
    Output {
        step_id: Option<String>,
        text: String,
    },
    StepCompleted {
        step_id: String,
        success: bool,
        error: Option<String>,
    },
    /// A server-reported error; does not by itself terminate the stream.
    ErrorReported { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    AwaitingStep,
    InStep,
    Done,
}

/// Line-fed SSE state machine.
pub struct StreamParser {
    state: StreamState,
    current_step: Option<String>,
    buffers: IndexMap<String, String>,
    stray_output: String,
    terminal: Option<serde_json::Value>,
    step_counter: usize,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            state: StreamState::AwaitingStep,
            current_step: None,
            buffers: IndexMap::new(),
            stray_output: String::new(),
            terminal: None,
            step_counter: 0,
        }
    }

    /// True once a terminal result candidate was captured.
    pub fn is_done(&self) -> bool {
        self.state == StreamState::Done
    }

    /// Buffered output accumulated for a step so far.
    pub fn output_for(&self, step_id: &str) -> Option<&str> {
        self.buffers.get(step_id).map(|s| s.as_str())
    }

    /// Output the server sent outside any announced step.
    pub fn stray_output(&self) -> &str {
        &self.stray_output
    }

    /// The captured terminal result, if the stream reached one.
    pub fn into_terminal(self) -> Option<serde_json::Value> {
        self.terminal
    }

    /// Feed one decoded line; returns the events it produced.
    pub fn feed_line(&mut self, line: &str) -> Vec<StreamEvent> {
        if self.state == StreamState::Done {
            return Vec::new();
        }

        let line = line.trim();
        // Blank lines are frame separators, `event:` lines informational,
        // `:`-prefixed lines SSE comments.
        if line.is_empty() || line.starts_with("event:") || line.starts_with(':') {
            return Vec::new();
        }

        let payload = match line.strip_prefix("data:") {
            Some(data) => data.trim(),
            // The server occasionally writes bare text between frames.
            None => return self.append_output(line.to_string()),
        };

        if payload.is_empty() || payload == "[DONE]" {
            return Vec::new();
        }

        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Object(event)) => {
                self.handle_event(serde_json::Value::Object(event))
            }
            // Parse failures and non-object JSON are raw text tokens.
            _ => self.append_output(payload.to_string()),
        }
    }

    fn handle_event(&mut self, event: serde_json::Value) -> Vec<StreamEvent> {
        let event_type = event.get("type").and_then(|t| t.as_str()).unwrap_or("");

        match event_type {
            "step_start" => {
                self.step_counter += 1;
                let step_id = ["step_id", "step_name"]
                    .iter()
                    .find_map(|key| event.get(*key).and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("step_{}", self.step_counter));
                let agent_name = event
                    .get("agent_name")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                self.buffers.entry(step_id.clone()).or_default();
                self.current_step = Some(step_id.clone());
                self.state = StreamState::InStep;
                vec![StreamEvent::StepStarted {
                    step_id,
                    agent_name,
                }]
            }

            "llm_token" | "token" => {
                let text = ["token", "content"]
                    .iter()
                    .find_map(|key| event.get(*key).and_then(|v| v.as_str()))
                    .unwrap_or("")
                    .to_string();
                self.append_output(text)
            }

            "llm_output" | "output" => {
                let text = ["output", "content"]
                    .iter()
                    .find_map(|key| event.get(*key).and_then(|v| v.as_str()))
                    .unwrap_or("")
                    .to_string();
                self.append_output(text)
            }

            "step_complete" => {
                let step_id = ["step_id", "step_name"]
                    .iter()
                    .find_map(|key| event.get(*key).and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .or_else(|| self.current_step.clone());
                self.current_step = None;
                self.state = StreamState::AwaitingStep;

                match step_id {
                    Some(step_id) => vec![StreamEvent::StepCompleted {
                        step_id,
                        success: event
                            .get("success")
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false),
                        error: event
                            .get("error")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string()),
                    }],
                    None => Vec::new(),
                }
            }

            "workflow_complete" => {
                self.terminal = Some(
                    event
                        .get("result")
                        .cloned()
                        .unwrap_or_else(|| event.clone()),
                );
                self.state = StreamState::Done;
                Vec::new()
            }

            "error" => {
                let message = event
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| event.to_string());
                vec![StreamEvent::ErrorReported { message }]
            }

            // Untyped complete-result object arriving mid-stream.
            _ if event.get("final_output").is_some() || event.get("step_results").is_some() => {
                self.terminal = Some(event);
                self.state = StreamState::Done;
                Vec::new()
            }

            _ => Vec::new(),
        }
    }

    fn append_output(&mut self, text: String) -> Vec<StreamEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        match &self.current_step {
            Some(step_id) => {
                self.buffers
                    .entry(step_id.clone())
                    .or_default()
                    .push_str(&text);
                vec![StreamEvent::Output {
                    step_id: Some(step_id.clone()),
                    text,
                }]
            }
            None => {
                self.stray_output.push_str(&text);
                vec![StreamEvent::Output {
                    step_id: None,
                    text,
                }]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut StreamParser, lines: &[&str]) -> Vec<StreamEvent> {
        lines
            .iter()
            .flat_map(|line| parser.feed_line(line))
            .collect()
    }

    #[test]
    fn test_step_lifecycle_buffers_tokens() {
        let mut parser = StreamParser::new();
        let events = feed(
            &mut parser,
            &[
                r#"data: {"type":"step_start","step_id":"s1","agent_name":"writer"}"#,
                "",
                r#"data: {"type":"token","token":"a"}"#,
                r#"data: {"type":"llm_token","token":"b"}"#,
                r#"data: {"type":"output","output":"c"}"#,
                r#"data: {"type":"step_complete","step_id":"s1","success":true}"#,
            ],
        );

        assert_eq!(parser.output_for("s1"), Some("abc"));
        assert!(!parser.is_done());
        assert!(matches!(
            events.first(),
            Some(StreamEvent::StepStarted { step_id, .. }) if step_id == "s1"
        ));
        assert!(matches!(
            events.last(),
            Some(StreamEvent::StepCompleted { success: true, .. })
        ));
    }

    #[test]
    fn test_raw_text_is_never_dropped() {
        let mut parser = StreamParser::new();
        let events = feed(
            &mut parser,
            &[
                r#"data: {"type":"step_start","step_id":"s1"}"#,
                "data: not json at all",
                r#"data: "bare json string""#,
            ],
        );

        assert_eq!(parser.output_for("s1"), Some("not json at all\"bare json string\""));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_workflow_complete_captures_result_payload() {
        let mut parser = StreamParser::new();
        feed(
            &mut parser,
            &[r#"data: {"type":"workflow_complete","result":{"success":true,"step_results":{}}}"#],
        );

        assert!(parser.is_done());
        let terminal = parser.into_terminal().unwrap();
        assert_eq!(terminal["success"], true);
    }

    #[test]
    fn test_untyped_terminal_object() {
        let mut parser = StreamParser::new();
        feed(
            &mut parser,
            &[r#"data: {"final_output":"done","step_results":{"s1":{"success":true}}}"#],
        );

        assert!(parser.is_done());
        assert_eq!(parser.into_terminal().unwrap()["final_output"], "done");
    }

    #[test]
    fn test_error_event_does_not_terminate() {
        let mut parser = StreamParser::new();
        let events = feed(
            &mut parser,
            &[
                r#"data: {"type":"error","message":"step exploded"}"#,
                r#"data: {"type":"workflow_complete","result":{"success":false}}"#,
            ],
        );

        assert!(matches!(
            events.first(),
            Some(StreamEvent::ErrorReported { message }) if message == "step exploded"
        ));
        assert!(parser.is_done());
    }

    #[test]
    fn test_framing_lines_are_skipped() {
        let mut parser = StreamParser::new();
        let events = feed(
            &mut parser,
            &["", "event: progress", ": keep-alive", "data: [DONE]", "data:"],
        );
        assert!(events.is_empty());
        assert!(parser.into_terminal().is_none());
    }

    #[test]
    fn test_stream_without_terminal_yields_none() {
        let mut parser = StreamParser::new();
        feed(
            &mut parser,
            &[
                r#"data: {"type":"step_start","step_id":"s1"}"#,
                r#"data: {"type":"token","token":"a"}"#,
                r#"data: {"type":"token","token":"b"}"#,
                r#"data: {"type":"token","token":"c"}"#,
                r#"data: {"type":"step_complete","step_id":"s1","success":true}"#,
            ],
        );

        assert_eq!(parser.output_for("s1"), Some("abc"));
        assert!(parser.into_terminal().is_none());
    }

    #[test]
    fn test_output_outside_any_step() {
        let mut parser = StreamParser::new();
        let events = feed(&mut parser, &["data: preamble text"]);
        assert_eq!(
            events,
            vec![StreamEvent::Output {
                step_id: None,
                text: "preamble text".to_string()
            }]
        );
        assert_eq!(parser.stray_output(), "preamble text");
    }

    #[test]
    fn test_lines_after_done_are_ignored() {
        let mut parser = StreamParser::new();
        feed(
            &mut parser,
            &[
                r#"data: {"type":"workflow_complete","result":{"success":true}}"#,
                r#"data: {"type":"token","token":"late"}"#,
            ],
        );
        assert!(parser.is_done());
    }

    #[test]
    fn test_step_start_without_id_is_numbered() {
        let mut parser = StreamParser::new();
        let events = feed(&mut parser, &[r#"data: {"type":"step_start"}"#]);
        assert!(matches!(
            events.first(),
            Some(StreamEvent::StepStarted { step_id, .. }) if step_id == "step_1"
        ));
    }
}
