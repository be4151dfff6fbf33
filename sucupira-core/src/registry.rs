//! Name-keyed tool registry with non-failing invocation.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::tool::{Tool, ToolDeclaration, validate_args};

/// Prefix of every observation produced by a failed tool call.
pub const ERROR_MARKER: &str = "[tool error]";

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The set of tools available to one agent.
///
/// Tools are resolved by name at call time. Declaration order is preserved so
/// that models see tools in the order they were registered.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self { tools: HashMap::new(), order: Vec::new(), timeout: DEFAULT_TOOL_TIMEOUT }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout applied by [`invoke`](Self::invoke).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if a tool with the same name is
    /// already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(CoreError::InvalidArgument(format!("tool '{name}' is already registered")));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Declarations of all registered tools, in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Call a tool by name and return its observation.
    ///
    /// Never fails: an unknown name, invalid arguments, an execution error,
    /// a timeout, or a panicking tool all produce a string starting with
    /// [`ERROR_MARKER`] so the calling model can keep reasoning with a
    /// degraded answer.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        let outcome = AssertUnwindSafe(self.try_invoke(name, &args))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CoreError::Tool(format!("panicked: {}", panic_message(&*payload)))));
        match outcome {
            Ok(output) => {
                debug!(tool = name, output_len = output.len(), "tool call succeeded");
                output
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                format!("{ERROR_MARKER} {name}: {e}")
            }
        }
    }

    async fn try_invoke(&self, name: &str, args: &Value) -> Result<String> {
        let tool = self.tools.get(name).ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "unknown tool; available tools: [{}]",
                self.order.join(", ")
            ))
        })?;
        let args = validate_args(&tool.parameters(), args)?;
        tokio::time::timeout(self.timeout, tool.execute(args))
            .await
            .map_err(|_| CoreError::timeout(format!("tool '{name}'"), self.timeout))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::tool::{ParamKind, ParamSpec, ToolArgs};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required("text", ParamKind::String, "text to echo")]
        }

        async fn execute(&self, args: ToolArgs) -> Result<String> {
            let text = args.require_str("text")?;
            if text == "boom" {
                return Err(CoreError::Tool("exploded".into()));
            }
            Ok(text.to_string())
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Tool for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn description(&self) -> &str {
            "Never finishes"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn execute(&self, _args: ToolArgs) -> Result<String> {
            std::future::pending().await
        }
    }

    struct Faulty;

    #[async_trait]
    impl Tool for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        fn description(&self) -> &str {
            "Panics on every call"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn execute(&self, _args: ToolArgs) -> Result<String> {
            panic!("index out of range")
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(50));
        registry.register(Arc::new(Echo)).unwrap();
        registry.register(Arc::new(Sleepy)).unwrap();
        registry
    }

    #[tokio::test]
    async fn invokes_by_name() {
        assert_eq!(registry().invoke("echo", json!({"text": "hi"})).await, "hi");
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_text() {
        let out = registry().invoke("echo", json!({"txt": "hi"})).await;
        assert!(out.starts_with(ERROR_MARKER), "{out}");
        let out = registry().invoke("echo", json!("hi")).await;
        assert!(out.starts_with(ERROR_MARKER), "{out}");
    }

    #[tokio::test]
    async fn execution_errors_become_error_text() {
        let out = registry().invoke("echo", json!({"text": "boom"})).await;
        assert!(out.starts_with(ERROR_MARKER));
        assert!(out.contains("exploded"));
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_tools() {
        let out = registry().invoke("search", json!({})).await;
        assert!(out.starts_with(ERROR_MARKER));
        assert!(out.contains("echo, sleepy"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tools_time_out() {
        let out = registry().invoke("sleepy", json!({})).await;
        assert!(out.starts_with(ERROR_MARKER));
        assert!(out.contains("timed out"));
    }

    #[tokio::test]
    async fn panicking_tools_become_error_text() {
        let mut registry = registry();
        registry.register(Arc::new(Faulty)).unwrap();
        let out = registry.invoke("faulty", json!({})).await;
        assert_eq!(out, format!("{ERROR_MARKER} faulty: Tool error: panicked: index out of range"));
        assert_eq!(registry.invoke("echo", json!({"text": "still here"})).await, "still here");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        assert!(registry.register(Arc::new(Echo)).is_err());
        assert_eq!(registry.names(), ["echo", "sleepy"]);
    }
}
