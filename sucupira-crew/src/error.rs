//! Errors raised while assembling or running a crew.

use sucupira_core::CoreError;
use thiserror::Error;

use crate::report::RunReport;

/// Errors produced by agents, tasks, and crews.
#[derive(Debug, Error)]
pub enum CrewError {
    /// Run inputs or a crew definition are unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A builder was missing a required part.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A task's gateway call failed. Later tasks were not run.
    #[error("Task '{task}' (#{index}) failed: {source}")]
    TaskFailure {
        task: String,
        index: usize,
        #[source]
        source: CoreError,
        /// The run up to the failure, including every completed output.
        report: Box<RunReport>,
    },
}

impl CrewError {
    /// The run report attached to a [`CrewError::TaskFailure`].
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            CrewError::TaskFailure { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrewError>;
