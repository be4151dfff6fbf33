//! # sucupira-model
//!
//! Generative model gateways implementing [`sucupira_core::Llm`].
//!
//! - [`MockLlm`]: plays back a script of tool calls and answers. Used by
//!   tests and offline demos.
//! - [`OllamaModel`]: a local Ollama server over `/api/chat` with native tool
//!   calling (feature `ollama`, on by default).

pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use mock::{MockLlm, MockStep, ToolCallRecord};
#[cfg(feature = "ollama")]
pub use ollama::{DEFAULT_OLLAMA_HOST, OllamaConfig, OllamaModel};
