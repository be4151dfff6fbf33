//! Scripted model for tests and offline demos.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use sucupira_core::{CoreError, Llm, LlmRequest, Result, ToolRegistry};
use tracing::debug;

/// One step of a [`MockLlm`] script.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Invoke a tool and keep going.
    CallTool { name: String, args: Value },
    /// Finish the current generation with this text.
    Respond(String),
    /// Finish the current generation with every observation collected during
    /// it, one per line.
    RespondWithObservations,
    /// Fail the current generation.
    Fail(String),
    /// Never finish.
    Hang,
}

impl MockStep {
    pub fn call_tool(name: impl Into<String>, args: Value) -> Self {
        Self::CallTool { name: name.into(), args }
    }

    pub fn respond(text: impl Into<String>) -> Self {
        Self::Respond(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// A tool call made by the mock and the observation it got back.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: Value,
    pub observation: String,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockStep>,
    requests: Vec<LlmRequest>,
    tool_calls: Vec<ToolCallRecord>,
}

/// A gateway that plays back a fixed script.
///
/// Steps are consumed across calls: each [`generate`](Llm::generate) runs
/// steps until one of them finishes the generation. An exhausted script
/// fails with [`CoreError::Model`].
///
/// ```rust,ignore
/// let llm = MockLlm::new([
///     MockStep::call_tool("journal_search", json!({"query": "medicina"})),
///     MockStep::RespondWithObservations,
/// ]);
/// ```
#[derive(Debug)]
pub struct MockLlm {
    name: String,
    state: Mutex<MockState>,
}

impl MockLlm {
    pub fn new(script: impl IntoIterator<Item = MockStep>) -> Self {
        Self {
            name: "mock".to_string(),
            state: Mutex::new(MockState { script: script.into_iter().collect(), ..Default::default() }),
        }
    }

    /// A mock that answers each call with the next text in `answers`.
    pub fn with_responses<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(answers.into_iter().map(|a| MockStep::Respond(a.into())))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.state().requests.clone()
    }

    /// Every tool call made so far.
    pub fn tool_calls(&self) -> Vec<ToolCallRecord> {
        self.state().tool_calls.clone()
    }

    /// Steps not yet played.
    pub fn remaining(&self) -> usize {
        self.state().script.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_step(&self) -> Option<MockStep> {
        self.state().script.pop_front()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest, tools: &ToolRegistry) -> Result<String> {
        self.state().requests.push(request);
        let mut observations = Vec::new();

        loop {
            let Some(step) = self.next_step() else {
                return Err(CoreError::Model("mock script exhausted".to_string()));
            };
            match step {
                MockStep::CallTool { name, args } => {
                    let observation = tools.invoke(&name, args.clone()).await;
                    debug!(tool = %name, "mock model called tool");
                    observations.push(observation.clone());
                    self.state().tool_calls.push(ToolCallRecord { name, args, observation });
                }
                MockStep::Respond(text) => return Ok(text),
                MockStep::RespondWithObservations => return Ok(observations.join("\n")),
                MockStep::Fail(message) => return Err(CoreError::Model(message)),
                MockStep::Hang => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use sucupira_core::{ERROR_MARKER, ParamKind, ParamSpec, Tool, ToolArgs};

    use super::*;

    struct Lookup;

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Find an ISSN"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required("title", ParamKind::String, "journal title")]
        }

        async fn execute(&self, args: ToolArgs) -> Result<String> {
            Ok(format!("{} ISSN=2222-2222", args.require_str("title")?))
        }
    }

    fn tools() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Lookup)).unwrap();
        registry
    }

    #[tokio::test]
    async fn plays_steps_in_order_across_calls() {
        let llm = MockLlm::with_responses(["first", "second"]);
        let tools = ToolRegistry::new();
        assert_eq!(llm.generate(LlmRequest::new("s", "a"), &tools).await.unwrap(), "first");
        assert_eq!(llm.generate(LlmRequest::new("s", "b"), &tools).await.unwrap(), "second");
        assert!(llm.generate(LlmRequest::new("s", "c"), &tools).await.is_err());
        assert_eq!(llm.requests().len(), 3);
    }

    #[tokio::test]
    async fn tool_observations_are_recorded_and_echoed() {
        let llm = MockLlm::new([
            MockStep::call_tool("lookup", json!({"title": "Medical Review"})),
            MockStep::call_tool("lookup", json!({})),
            MockStep::RespondWithObservations,
        ]);
        let out = llm.generate(LlmRequest::new("s", "p"), &tools()).await.unwrap();

        let calls = llm.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].observation, "Medical Review ISSN=2222-2222");
        assert!(calls[1].observation.starts_with(ERROR_MARKER));
        assert!(out.starts_with("Medical Review ISSN=2222-2222\n"));
    }

    #[tokio::test]
    async fn fail_step_is_a_model_error() {
        let llm = MockLlm::new([MockStep::fail("quota")]);
        let err = llm.generate(LlmRequest::new("s", "p"), &tools()).await.unwrap_err();
        assert!(matches!(err, CoreError::Model(m) if m == "quota"));
    }

    #[tokio::test(start_paused = true)]
    async fn hang_step_never_returns() {
        let llm = MockLlm::new([MockStep::Hang]);
        let tools = tools();
        let result =
            tokio::time::timeout(Duration::from_secs(60), llm.generate(LlmRequest::new("s", "p"), &tools)).await;
        assert!(result.is_err());
    }
}
