//! Error handling for the cloudpipe crate
//!
//! Pipeline construction and execution report [`PipelineError`]. This module
//! wraps it together with the configuration and logging failures that sit
//! around a pipeline run, and provides a Result alias for those call sites.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for cloudpipe operations outside the pipeline core
#[derive(Error, Debug)]
pub enum CloudPipeError {
    /// Errors raised while building or running a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

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
        source: Box<CloudPipeError>,
    },
}

impl CloudPipeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CloudPipeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The pipeline error at the root of this error, if any.
    pub fn pipeline_error(&self) -> Option<&PipelineError> {
        match self {
            CloudPipeError::Pipeline(e) => Some(e),
            CloudPipeError::WithContext { source, .. } => source.pipeline_error(),
            _ => None,
        }
    }
}

/// Result type alias for cloudpipe operations
pub type Result<T> = std::result::Result<T, CloudPipeError>;

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
        self.map_err(|e| CloudPipeError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CloudPipeError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StructureError;

    #[test]
    fn test_error_display() {
        let err = CloudPipeError::Config("chunk_size must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: chunk_size must be at least 1"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = CloudPipeError::Serialization("bad toml".to_string());
        let with_ctx = err.with_context("Failed to load config");
        assert!(with_ctx.to_string().contains("Failed to load config"));
        assert!(with_ctx.to_string().contains("bad toml"));
    }

    #[test]
    fn test_pipeline_error_survives_context() {
        let result: std::result::Result<(), PipelineError> =
            Err(PipelineError::Structure(StructureError::EmptyPipeline));
        let err = result.context("Reading pipeline.xml").unwrap_err();

        let inner = err.pipeline_error().expect("pipeline error should be reachable");
        assert!(inner.is_structure());
    }
}
