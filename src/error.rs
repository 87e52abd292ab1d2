//! Error handling for sigcond-rs
//!
//! This module defines the crate-wide error type and a Result alias.
//! Graph-structure failures live in [`crate::pipeline::PipelineError`] and
//! convert into [`SigCondError::Pipeline`].
//!
//! Note that a filter declining to produce output (divide-by-zero, a
//! rejected sample) is *not* an error; see
//! [`FilterOutcome::Cancelled`](crate::pipeline::FilterOutcome::Cancelled).

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for sigcond-rs operations
#[derive(Error, Debug)]
pub enum SigCondError {
    /// Invalid parameters supplied at setup time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A name or id that must be unique was reused
    #[error("Duplicate {kind} '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    /// Errors raised while wiring or analysing a filter graph
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Malformed line in a replay file
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SigCondError>,
    },
}

impl SigCondError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SigCondError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        SigCondError::Configuration(message.into())
    }
}

/// Result type alias for sigcond-rs operations
pub type Result<T> = std::result::Result<T, SigCondError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SigCondError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SigCondError::from(e).with_context(f()))
    }
}
