//! Pipeline Results
//!
//! This module defines the result types returned by the pipeline.

use crate::pipeline::context::PipelineContext;

/// Pipeline Output
///
/// The final result of executing the entire pipeline.
#[derive(Debug)]
pub enum PipelineOutput {
    /// Every processor ran
    Completed {
        /// The context ready for the model boundary
        context: PipelineContext,
        /// Statistics about the processing
        stats: ProcessingStats,
    },

    /// A processor aborted the run
    Aborted {
        /// Reason for abortion
        reason: String,
        /// Name of the processor that aborted
        aborted_by: String,
        /// Context as the aborting processor returned it
        context: PipelineContext,
        stats: ProcessingStats,
    },
}

impl PipelineOutput {
    pub fn context(&self) -> &PipelineContext {
        match self {
            PipelineOutput::Completed { context, .. } | PipelineOutput::Aborted { context, .. } => {
                context
            }
        }
    }

    pub fn stats(&self) -> &ProcessingStats {
        match self {
            PipelineOutput::Completed { stats, .. } | PipelineOutput::Aborted { stats, .. } => stats,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutput::Completed { .. })
    }

    pub fn into_context(self) -> PipelineContext {
        match self {
            PipelineOutput::Completed { context, .. } | PipelineOutput::Aborted { context, .. } => {
                context
            }
        }
    }
}

/// Processing Statistics
///
/// Per-stage record of a run, returned to the caller instead of being
/// written to a shared sink.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    /// Number of processors executed
    pub processors_run: usize,
    /// Total processing time in milliseconds
    pub total_duration_ms: u64,
    /// Per-processor durations (processor_name, duration_ms)
    pub processor_durations: Vec<(String, u64)>,
}

impl ProcessingStats {
    /// Record that a processor ran
    pub fn record_processor(&mut self, name: String, duration_ms: u64) {
        self.processors_run += 1;
        self.total_duration_ms += duration_ms;
        self.processor_durations.push((name, duration_ms));
    }

    /// Processor names in the order they ran
    pub fn processor_names(&self) -> Vec<&str> {
        self.processor_durations
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
