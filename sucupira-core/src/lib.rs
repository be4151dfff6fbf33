//! # sucupira-core
//!
//! Contracts shared by every Sucupira crate:
//!
//! - [`Tool`] and [`ToolRegistry`]: named capabilities a model may call, with
//!   argument validation and non-failing invocation.
//! - [`Llm`]: the generative model gateway, which owns tool selection.
//! - [`CoreError`]: failures raised by tools and gateways.
//!
//! Retrieval lives in `sucupira-rag`, gateway adapters in `sucupira-model`,
//! and task orchestration in `sucupira-crew`.

pub mod error;
pub mod model;
pub mod registry;
pub mod tool;

pub use error::{CoreError, Result};
pub use model::{GenerateConfig, Llm, LlmRequest};
pub use registry::{ERROR_MARKER, ToolRegistry};
pub use tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolDeclaration, parameters_schema, validate_args};
