//! # sucupira-crew
//!
//! Sequential task orchestration in the style of a "crew": [`Agent`]s with
//! roles and tools, [`Task`]s bound to agents, and a [`Crew`] that runs the
//! tasks in order, feeding each task the outputs of its prerequisites.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sucupira_crew::{Agent, Crew, Inputs, Task};
//!
//! let researcher = Arc::new(
//!     Agent::builder("Journal Researcher").llm(model.clone()).tool(search_tool).build()?,
//! );
//! let find = Task::builder("find")
//!     .description("Find journals about {topic}")
//!     .expected_output("Titles with ISSN and Qualis stratum")
//!     .agent(researcher.clone())
//!     .build()?;
//! let summarize = Task::builder("summarize")
//!     .description("Summarize the best venues for {topic}")
//!     .agent(researcher)
//!     .context(["find"])
//!     .build()?;
//!
//! let crew = Crew::builder().task(find).task(summarize).build()?;
//! let output = crew.kickoff(&Inputs::from([("topic".into(), "medicina".into())])).await?;
//! println!("{}", output.raw);
//! ```
//!
//! A failed run returns [`CrewError::TaskFailure`] carrying the
//! [`RunReport`]; [`Crew::resume`] continues from the failed task.

pub mod agent;
pub mod crew;
pub mod error;
pub mod report;
pub mod task;
pub mod template;

pub use agent::{Agent, AgentBuilder};
pub use crew::{CONTEXT_SEPARATOR, Crew, CrewBuilder, CrewOutput, TaskOutput};
pub use error::{CrewError, Result};
pub use report::{RunReport, RunStatus, TaskRecord, TaskState};
pub use task::{Task, TaskBuilder};
pub use template::{Inputs, Template};
