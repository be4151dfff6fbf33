//! Sequential execution of tasks with context propagation.

use tracing::{Instrument, error, info, info_span};

use crate::error::{CrewError, Result};
use crate::report::{RunReport, RunStatus};
use crate::task::Task;
use crate::template::Inputs;

/// Placed between prerequisite outputs in a task's context.
pub const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// The recorded output of one completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub name: String,
    /// Role of the agent that produced it.
    pub agent: String,
    /// The rendered description.
    pub description: String,
    pub raw: String,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrewOutput {
    /// Output of the last task.
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub report: RunReport,
}

/// An ordered list of tasks run one at a time.
///
/// ```rust,ignore
/// let crew = Crew::builder().task(find).task(rate).build()?;
/// let inputs = Inputs::from([("topic".to_string(), "medicina".to_string())]);
/// let output = crew.kickoff(&inputs).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Crew {
    tasks: Vec<Task>,
}

#[derive(Debug, Default)]
pub struct CrewBuilder {
    tasks: Vec<Task>,
}

impl CrewBuilder {
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// # Errors
    ///
    /// [`CrewError::InvalidArgument`] if there are no tasks, two tasks share
    /// a name, or a task lists a prerequisite that is not an earlier task.
    pub fn build(self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(CrewError::InvalidArgument("a crew needs at least one task".into()));
        }
        for (index, task) in self.tasks.iter().enumerate() {
            let earlier = &self.tasks[..index];
            if earlier.iter().any(|t| t.name() == task.name()) {
                return Err(CrewError::InvalidArgument(format!("duplicate task name '{}'", task.name())));
            }
            for prerequisite in task.context() {
                if !earlier.iter().any(|t| t.name() == prerequisite) {
                    return Err(CrewError::InvalidArgument(format!(
                        "task '{}' depends on '{prerequisite}', which is not an earlier task",
                        task.name()
                    )));
                }
            }
        }
        Ok(Crew { tasks: self.tasks })
    }
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run every task in order.
    ///
    /// All placeholders of all tasks and their agents are checked against
    /// `inputs` before the first task starts.
    ///
    /// # Errors
    ///
    /// - [`CrewError::InvalidArgument`] if an input is missing.
    /// - [`CrewError::TaskFailure`] if a task's model call fails or times
    ///   out; the attached report keeps every completed output.
    pub async fn kickoff(&self, inputs: &Inputs) -> Result<CrewOutput> {
        self.validate_inputs(inputs)?;
        let report = RunReport::new(self.tasks.iter().map(Task::name));
        self.run_from(inputs, report, 0).await
    }

    /// Continue a failed run from the task it stopped at.
    ///
    /// Completed tasks in `report` are not run again; their outputs feed the
    /// remaining tasks as if the run had never stopped.
    ///
    /// # Errors
    ///
    /// [`CrewError::InvalidArgument`] if `report` was produced by a crew with
    /// a different task list, plus everything [`kickoff`](Self::kickoff)
    /// returns.
    pub async fn resume(&self, inputs: &Inputs, mut report: RunReport) -> Result<CrewOutput> {
        let same_tasks = report.tasks.iter().map(|t| t.name.as_str()).eq(self.tasks.iter().map(Task::name));
        if !same_tasks {
            return Err(CrewError::InvalidArgument("run report does not match this crew's tasks".into()));
        }
        self.validate_inputs(inputs)?;

        let start = report.first_incomplete().unwrap_or(self.tasks.len());
        for record in &mut report.tasks[start..] {
            record.reset();
        }
        report.status = RunStatus::InProgress;
        report.finished_at = None;
        info!(run_id = %report.run_id, start, "resuming run");
        self.run_from(inputs, report, start).await
    }

    fn validate_inputs(&self, inputs: &Inputs) -> Result<()> {
        let missing: Vec<String> = self
            .tasks
            .iter()
            .flat_map(move |task| {
                task.placeholders()
                    .chain(task.agent().placeholders())
                    .filter(move |p| !inputs.contains_key(*p))
                    .map(move |p| format!("'{p}' (task '{}')", task.name()))
            })
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CrewError::InvalidArgument(format!("missing inputs: {}", missing.join(", "))))
        }
    }

    /// Concatenated prerequisite outputs, or `None` for a task without prerequisites.
    fn context_for(task: &Task, report: &RunReport) -> Option<String> {
        if task.context().is_empty() {
            return None;
        }
        let outputs: Vec<&str> = task.context().iter().filter_map(|name| report.output(name)).collect();
        Some(outputs.join(CONTEXT_SEPARATOR))
    }

    async fn run_from(&self, inputs: &Inputs, mut report: RunReport, start: usize) -> Result<CrewOutput> {
        let span = info_span!("crew_run", run_id = %report.run_id, tasks = self.tasks.len(), start);
        async move {
            for (index, task) in self.tasks.iter().enumerate().skip(start) {
                let description = task.description().render(inputs)?;
                let expected_output = task.expected_output().render(inputs)?;
                let system = task.agent().system_prompt(inputs)?;
                let context = Self::context_for(task, &report);

                report.tasks[index].start();
                info!(task = %task.name(), index, agent = %task.agent().role(), "task started");

                let task_span = info_span!("task", task = %task.name(), index);
                let result = task
                    .agent()
                    .execute(&system, &description, &expected_output, context.as_deref())
                    .instrument(task_span)
                    .await;

                match result {
                    Ok(output) => {
                        info!(task = %task.name(), index, output_len = output.len(), "task completed");
                        report.tasks[index].complete(output);
                    }
                    Err(source) => {
                        error!(task = %task.name(), index, error = %source, "task failed");
                        report.tasks[index].fail(source.to_string());
                        report.finish(RunStatus::Failed);
                        return Err(CrewError::TaskFailure {
                            task: task.name().to_string(),
                            index,
                            source,
                            report: Box::new(report),
                        });
                    }
                }
            }

            report.finish(RunStatus::Done);
            info!(run_id = %report.run_id, "run completed");
            self.output(inputs, report)
        }
        .instrument(span)
        .await
    }

    fn output(&self, inputs: &Inputs, report: RunReport) -> Result<CrewOutput> {
        let mut tasks_output = Vec::with_capacity(self.tasks.len());
        for (task, record) in self.tasks.iter().zip(&report.tasks) {
            tasks_output.push(TaskOutput {
                name: task.name().to_string(),
                agent: task.agent().rendered_role(inputs)?,
                description: task.description().render(inputs)?,
                raw: record.output.clone().unwrap_or_default(),
            });
        }
        let raw = tasks_output.last().map(|t| t.raw.clone()).unwrap_or_default();
        Ok(CrewOutput { raw, tasks_output, report })
    }
}
