//! # sucupira-tool
//!
//! Tools agents can call besides the catalog search in `sucupira-rag`:
//!
//! - [`FunctionTool`]: wrap an async closure as a tool.
//! - [`CrossrefJournalTool`]: journal metadata by ISSN from the Crossref API.
//!
//! Register them on a [`sucupira_core::ToolRegistry`]; the registry validates
//! arguments and turns failures into observations.

pub mod crossref;
pub mod function;

pub use crossref::{CROSSREF_BASE_URL, CrossrefJournalTool, CrossrefJournalToolBuilder, JournalInfo, normalize_issn};
pub use function::FunctionTool;
