//! Tasks: one unit of work for one agent.

use std::sync::Arc;

use crate::agent::Agent;
use crate::error::{CrewError, Result};
use crate::template::Template;

/// A unit of work bound to an [`Agent`].
///
/// `description` and `expected_output` are [`Template`]s rendered from the
/// run inputs. `context` names earlier tasks whose outputs are handed to this
/// one.
#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    description: Template,
    expected_output: Template,
    agent: Arc<Agent>,
    context: Vec<String>,
}

impl Task {
    pub fn builder(name: impl Into<String>) -> TaskBuilder {
        TaskBuilder {
            name: name.into(),
            description: None,
            expected_output: Template::new(""),
            agent: None,
            context: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &Template {
        &self.description
    }

    pub fn expected_output(&self) -> &Template {
        &self.expected_output
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Prerequisite task names, in declared order.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Every placeholder this task needs, description first.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.description
            .placeholders()
            .iter()
            .chain(self.expected_output.placeholders())
            .map(String::as_str)
    }
}

pub struct TaskBuilder {
    name: String,
    description: Option<Template>,
    expected_output: Template,
    agent: Option<Arc<Agent>>,
    context: Vec<String>,
}

impl TaskBuilder {
    pub fn description(mut self, description: impl Into<Template>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<Template>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Tasks whose outputs become this task's context.
    pub fn context<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.extend(prerequisites.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Task> {
        if self.name.trim().is_empty() {
            return Err(CrewError::ConfigError("task name must not be empty".into()));
        }
        let description = self
            .description
            .ok_or_else(|| CrewError::ConfigError(format!("task '{}' has no description", self.name)))?;
        let agent = self
            .agent
            .ok_or_else(|| CrewError::ConfigError(format!("task '{}' has no agent", self.name)))?;
        Ok(Task {
            name: self.name,
            description,
            expected_output: self.expected_output,
            agent,
            context: self.context,
        })
    }
}
