//! Pipeline Errors
//!
//! This module defines error types for the context pipeline.

use crate::pipeline::formatters::FormatError;
use thiserror::Error;

/// Process Error
///
/// Errors raised by a single processor. A processor that returns one of these
/// produces no context, so nothing it did is visible to the next stage.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A message does not have the shape the processor requires
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A content formatter could not render its section
    #[error("Formatter '{formatter}' failed: {source}")]
    Formatter {
        formatter: &'static str,
        #[source]
        source: FormatError,
    },

    /// Generic processing error
    #[error("Processing error: {0}")]
    Generic(String),
}

impl ProcessError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        ProcessError::MalformedInput(reason.into())
    }
}

/// Pipeline Error
///
/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A processor failed
    #[error("Processor '{processor}' failed: {error}")]
    ProcessorFailed {
        processor: String,
        #[source]
        error: ProcessError,
    },

    /// No processors registered
    #[error("No processors registered in pipeline")]
    NoProcessors,

    /// The caller cancelled the run
    #[error("Pipeline cancelled before '{processor}' completed")]
    Cancelled { processor: String },

    /// The run exceeded its time limit
    #[error("Pipeline timeout: {limit_ms}ms exceeded")]
    Timeout { limit_ms: u64 },
}
