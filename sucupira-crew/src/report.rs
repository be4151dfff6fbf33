//! Run and task state tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Done,
    Failed,
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub name: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: TaskState::Pending,
            output: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::pending(&self.name);
    }

    pub(crate) fn start(&mut self) {
        self.state = TaskState::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self, output: String) {
        self.state = TaskState::Completed;
        self.output = Some(output);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.state = TaskState::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }
}

/// The state of a run, kept whether it succeeds or fails.
///
/// A failed report can be handed to [`Crew::resume`](crate::Crew::resume)
/// to continue from the failed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub tasks: Vec<TaskRecord>,
}

impl RunReport {
    pub(crate) fn new<'a>(task_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::InProgress,
            started_at: Utc::now(),
            finished_at: None,
            tasks: task_names.into_iter().map(TaskRecord::pending).collect(),
        }
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn task(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Recorded output of a completed task.
    pub fn output(&self, name: &str) -> Option<&str> {
        self.task(name).and_then(|t| t.output.as_deref())
    }

    /// Position of the first task that has not completed.
    pub fn first_incomplete(&self) -> Option<usize> {
        self.tasks.iter().position(|t| t.state != TaskState::Completed)
    }

    /// The task a failed run stopped at.
    pub fn failed_task(&self) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.state == TaskState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_has_every_task_pending() {
        let report = RunReport::new(["find", "rate"]);
        assert_eq!(report.status, RunStatus::InProgress);
        assert!(report.tasks.iter().all(|t| t.state == TaskState::Pending));
        assert_eq!(report.first_incomplete(), Some(0));
    }

    #[test]
    fn failure_is_located_and_outputs_kept() {
        let mut report = RunReport::new(["find", "rate", "summarize"]);
        report.tasks[0].complete("ISSN=2222-2222".into());
        report.tasks[1].start();
        report.tasks[1].fail("timed out".into());
        report.finish(RunStatus::Failed);

        assert_eq!(report.output("find"), Some("ISSN=2222-2222"));
        assert_eq!(report.failed_task().map(|t| t.name.as_str()), Some("rate"));
        assert_eq!(report.first_incomplete(), Some(1));
        assert_eq!(report.tasks[2].state, TaskState::Pending);
    }

    #[test]
    fn serializes_states_in_snake_case() {
        let report = RunReport::new(["find"]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["tasks"][0]["state"], "pending");
        let back: RunReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }
}
