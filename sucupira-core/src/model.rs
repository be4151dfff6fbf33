//! The generative model gateway contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::ToolRegistry;

/// Sampling parameters passed to a gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Sampling temperature. `None` leaves the backend default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens. `None` leaves the backend default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// One generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Instructions describing who the model is acting as.
    pub system: String,
    /// The task prompt.
    pub prompt: String,
    pub config: GenerateConfig,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { system: system.into(), prompt: prompt.into(), config: GenerateConfig::default() }
    }

    pub fn with_config(mut self, config: GenerateConfig) -> Self {
        self.config = config;
        self
    }
}

/// A generative model.
///
/// The gateway owns the reasoning loop: it may call any tool in `tools` zero
/// or more times through [`ToolRegistry::invoke`] and fold the observations
/// back into its context before returning the final text. Callers only supply
/// the tools and read the answer.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Model identifier, used in logs.
    fn name(&self) -> &str;

    /// Produce the final answer for `request`.
    async fn generate(&self, request: LlmRequest, tools: &ToolRegistry) -> Result<String>;
}
