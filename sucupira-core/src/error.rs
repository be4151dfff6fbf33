//! Error types shared by tools and model gateways.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by tools and generative model gateways.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A caller supplied malformed arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A tool failed while executing.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The generative model returned an unusable response.
    #[error("Model error: {0}")]
    Model(String),

    /// A network call to a backing service failed.
    #[error("External call to {service} failed: {message}")]
    ExternalCallFailure {
        /// The service that was being called.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// A bounded call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The configured bound.
        after: Duration,
    },
}

impl CoreError {
    /// Shorthand for [`CoreError::ExternalCallFailure`].
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCallFailure { service: service.into(), message: message.into() }
    }

    /// Shorthand for [`CoreError::Timeout`].
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout { operation: operation.into(), after }
    }
}

/// A convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
