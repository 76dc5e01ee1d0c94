// SPDX-License-Identifier: MIT

//! Typed error handling for nourish-rs
//!
//! Safety violations and unparseable model output are not errors here: the
//! former become refusal messages in the result, the latter are recovered by
//! the step that received them. Everything in this module aborts a run.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, NourishError>;

/// Top-level error type for nourish-rs
#[derive(Debug, Error)]
pub enum NourishError {
    /// API errors from the generation backend
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid patterns, bad URLs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow graph and execution errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Model/LLM errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Invalid safety pattern
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Workflow graph and execution errors
#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    /// No entry step was set before compiling
    #[error("Workflow has no entry step")]
    MissingEntry,

    /// A transition or the entry refers to a step that was never registered
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// The same step was registered twice
    #[error("Step registered twice: {0}")]
    DuplicateStep(String),

    /// A registered step has no outgoing transition
    #[error("Step '{0}' has no outgoing transition")]
    MissingTransition(String),

    /// A step was given a second outgoing transition
    #[error("Step '{0}' has more than one outgoing transition")]
    DuplicateTransition(String),

    /// A router picked a target outside the declared branch set
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// The transition table contains a cycle
    #[error("Circular dependency detected: {0:?}")]
    CircularDependency(Vec<String>),

    /// A step was reached a second time in one run
    #[error("Step '{0}' visited twice in one run")]
    StepRevisited(String),

    /// A patch tried to rewrite a write-once field
    #[error("Field '{0}' cannot be changed once set")]
    ImmutableField(String),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Provider not supported
    #[error("Model provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Every attempt failed
    #[error("Model call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl NourishError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for NourishError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for NourishError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
