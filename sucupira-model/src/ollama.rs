//! Ollama gateway over the native `/api/chat` endpoint.
//!
//! Tools from the [`ToolRegistry`] are offered as native function
//! declarations. When the model answers with `tool_calls`, each call goes
//! through [`ToolRegistry::invoke`] and the observation is sent back as a
//! `tool` message, for at most `max_tool_rounds` rounds. After the last
//! round tools are withheld so the model has to answer in text.
//!
//! # Example
//!
//! ```rust,ignore
//! use sucupira_model::ollama::{OllamaConfig, OllamaModel};
//!
//! let model = OllamaModel::new(OllamaConfig::new("llama3.2"))?;
//! // or: OllamaModel::new(OllamaConfig::from_env()?)?
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sucupira_core::{CoreError, GenerateConfig, Llm, LlmRequest, Result, ToolDeclaration, ToolRegistry};
use tracing::{debug, info, warn};

/// Where a local Ollama server listens by default.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

const SERVICE: &str = "ollama";
const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection and loop settings for [`OllamaModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    /// Upper bound on tool-call rounds within one generation.
    pub max_tool_rounds: usize,
    /// HTTP timeout for each `/api/chat` request.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
}

impl OllamaConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: model.into(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read `OLLAMA_MODEL` (required) and `OLLAMA_HOST` (optional).
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("OLLAMA_MODEL").map_err(|_| {
            CoreError::InvalidArgument("OLLAMA_MODEL environment variable not set".to_string())
        })?;
        let mut config = Self::new(model);
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.host = normalize_host(&host);
        }
        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = normalize_host(&host.into());
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// `OLLAMA_HOST` is often given without a scheme (`0.0.0.0:11434`).
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// ── wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "ChatOptions::is_empty")]
    options: ChatOptions,
}

#[derive(Debug, Default, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl ChatOptions {
    fn from_config(config: &GenerateConfig) -> Self {
        Self { temperature: config.temperature, num_predict: config.max_output_tokens }
    }

    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self { role: role.to_string(), content: content.into(), tool_calls: Vec::new(), tool_name: None }
    }

    fn tool_result(name: &str, observation: String) -> Self {
        Self { tool_name: Some(name.to_string()), ..Self::new("tool", observation) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

fn tool_schema(declaration: &ToolDeclaration) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": declaration.name,
            "description": declaration.description,
            "parameters": declaration.parameters_schema(),
        }
    })
}

/// Some models send arguments as a JSON-encoded string.
fn decode_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

// ── gateway ────────────────────────────────────────────────────────

/// A model served by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(CoreError::InvalidArgument("model name must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CoreError::InvalidArgument(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn chat(&self, messages: &[ChatMessage], tools: Vec<Value>, options: &GenerateConfig) -> Result<ChatMessage> {
        let url = format!("{}/api/chat", self.config.host);
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            tools,
            options: ChatOptions::from_config(options),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::external(SERVICE, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CoreError::external(SERVICE, format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoreError::external(SERVICE, format!("failed to parse response: {e}")))?;
        Ok(parsed.message)
    }
}

#[async_trait]
impl Llm for OllamaModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: LlmRequest, tools: &ToolRegistry) -> Result<String> {
        let declarations: Vec<Value> = tools.declarations().iter().map(tool_schema).collect();
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage::new("system", request.system));
        }
        messages.push(ChatMessage::new("user", request.prompt));

        let mut round = 0;
        loop {
            let offered = if round < self.config.max_tool_rounds { declarations.clone() } else { Vec::new() };
            let reply = self.chat(&messages, offered, &request.config).await?;

            if reply.tool_calls.is_empty() {
                if reply.content.trim().is_empty() {
                    return Err(CoreError::Model("model returned an empty answer".to_string()));
                }
                info!(model = %self.config.model, tool_rounds = round, "generation completed");
                return Ok(reply.content);
            }
            if round >= self.config.max_tool_rounds {
                warn!(model = %self.config.model, "model requested tools after the last round");
                return Err(CoreError::Model("model kept requesting tools after the last round".to_string()));
            }

            round += 1;
            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                debug!(tool = %call.function.name, round, "model requested tool");
                let observation = tools.invoke(&call.function.name, decode_arguments(call.function.arguments)).await;
                messages.push(ChatMessage::tool_result(&call.function.name, observation));
            }
        }
    }
}
