//! Agents: a role, its tools, and the model that plays it.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use sucupira_core::{CoreError, GenerateConfig, Llm, LlmRequest, Tool, ToolRegistry};
use tracing::{debug, warn};

use crate::error::{CrewError, Result};
use crate::template::{Inputs, Template};

const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(120);

/// A configured role with goal, backstory, tools, and a model.
///
/// Role, goal, and backstory may hold `{placeholder}`s; they are filled from
/// the run inputs like task descriptions.
///
/// ```rust,ignore
/// let researcher = Agent::builder("Journal Researcher")
///     .goal("Find journals relevant to {topic}")
///     .backstory("You know the CAPES Qualis catalog by heart.")
///     .llm(model)
///     .tool(Arc::new(journal_search))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct Agent {
    role: Template,
    goal: Template,
    backstory: Template,
    llm: Arc<dyn Llm>,
    tools: ToolRegistry,
    config: GenerateConfig,
    timeout: Duration,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role.source())
            .field("llm", &self.llm.name())
            .field("tools", &self.tools.names())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn builder(role: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(role)
    }

    /// The role as written, placeholders unfilled.
    pub fn role(&self) -> &str {
        self.role.source()
    }

    pub fn goal(&self) -> &str {
        self.goal.source()
    }

    pub fn backstory(&self) -> &str {
        self.backstory.source()
    }

    /// Placeholder names used by role, goal, and backstory.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.role
            .placeholders()
            .iter()
            .chain(self.goal.placeholders())
            .chain(self.backstory.placeholders())
            .map(String::as_str)
    }

    /// The role with placeholders filled from `inputs`.
    pub fn rendered_role(&self, inputs: &Inputs) -> Result<String> {
        self.role.render(inputs)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instructions describing who the model is playing.
    ///
    /// # Errors
    ///
    /// [`CrewError::InvalidArgument`] if a placeholder has no value in `inputs`.
    pub fn system_prompt(&self, inputs: &Inputs) -> Result<String> {
        let backstory = self.backstory.render(inputs)?;
        let goal = self.goal.render(inputs)?;
        let mut prompt = format!("You are {}.", self.role.render(inputs)?);
        if !backstory.is_empty() {
            let _ = write!(prompt, " {backstory}");
        }
        if !goal.is_empty() {
            let _ = write!(prompt, "\nYour personal goal is: {goal}");
        }
        if !self.tools.is_empty() {
            let _ = write!(prompt, "\nYou may use these tools: {}", self.tools.names().join(", "));
        }
        Ok(prompt)
    }

    /// The task prompt: description, expected output, and prerequisite context.
    pub fn task_prompt(&self, description: &str, expected_output: &str, context: Option<&str>) -> String {
        let mut prompt = description.to_string();
        if !expected_output.is_empty() {
            let _ = write!(prompt, "\n\nThis is the expected criteria for your final answer: {expected_output}");
        }
        if let Some(context) = context {
            let _ = write!(prompt, "\n\nThis is the context you're working with:\n{context}");
        }
        prompt
    }

    /// Run one task through the model, bounded by the agent timeout.
    ///
    /// `system` is the output of [`system_prompt`](Self::system_prompt).
    pub async fn execute(
        &self,
        system: &str,
        description: &str,
        expected_output: &str,
        context: Option<&str>,
    ) -> sucupira_core::Result<String> {
        let request = LlmRequest::new(system, self.task_prompt(description, expected_output, context))
            .with_config(self.config);
        debug!(role = %self.role.source(), model = self.llm.name(), "sending task to model");

        tokio::time::timeout(self.timeout, self.llm.generate(request, &self.tools))
            .await
            .map_err(|_| {
                warn!(role = %self.role.source(), timeout = ?self.timeout, "model call timed out");
                CoreError::timeout(format!("model '{}'", self.llm.name()), self.timeout)
            })?
    }
}

/// Builder for [`Agent`]. A model is required.
pub struct AgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    llm: Option<Arc<dyn Llm>>,
    tools: Vec<Arc<dyn Tool>>,
    tool_timeout: Option<Duration>,
    config: GenerateConfig,
    timeout: Duration,
}

impl AgentBuilder {
    fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            llm: None,
            tools: Vec::new(),
            tool_timeout: None,
            config: GenerateConfig::default(),
            timeout: DEFAULT_AGENT_TIMEOUT,
        }
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Bound on each tool call made on this agent's behalf.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn config(mut self, config: GenerateConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound on the whole model call for one task, tool calls included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        if self.role.trim().is_empty() {
            return Err(CrewError::ConfigError("agent role must not be empty".into()));
        }
        let llm = self
            .llm
            .ok_or_else(|| CrewError::ConfigError(format!("agent '{}' has no model", self.role)))?;
        if self.timeout.is_zero() {
            return Err(CrewError::ConfigError("agent timeout must be greater than zero".into()));
        }

        let mut tools = ToolRegistry::new();
        if let Some(timeout) = self.tool_timeout {
            tools = tools.with_timeout(timeout);
        }
        for tool in self.tools {
            tools
                .register(tool)
                .map_err(|e| CrewError::ConfigError(format!("agent '{}': {e}", self.role)))?;
        }

        Ok(Agent {
            role: Template::new(self.role),
            goal: Template::new(self.goal),
            backstory: Template::new(self.backstory),
            llm,
            tools,
            config: self.config,
            timeout: self.timeout,
        })
    }
}
