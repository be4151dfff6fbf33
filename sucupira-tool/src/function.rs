//! Closure-backed tools.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sucupira_core::{ParamSpec, Result, Tool, ToolArgs};

type Handler = Arc<dyn Fn(ToolArgs) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// A [`Tool`] whose behavior is an async closure.
///
/// # Example
///
/// ```rust,ignore
/// use sucupira_core::{ParamKind, ParamSpec};
/// use sucupira_tool::FunctionTool;
///
/// let upper = FunctionTool::new("upper", "Uppercase the input", |args| async move {
///     Ok(args.require_str("text")?.to_uppercase())
/// })
/// .with_param(ParamSpec::required("text", ParamKind::String, "text to convert"));
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    handler: Handler,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Declare one more parameter.
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(params);
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        self.params.clone()
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        (self.handler)(args).await
    }
}
