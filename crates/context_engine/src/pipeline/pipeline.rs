//! Context Pipeline Implementation
//!
//! This module implements the orchestrator that runs processors in order.

use super::context::PipelineContext;
use super::error::PipelineError;
use super::result::{PipelineOutput, ProcessingStats};
use super::traits::Processor;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Context Pipeline
///
/// Runs a fixed sequence of processors. Each processor receives the context
/// produced by the previous one.
///
/// # Example
///
/// ```no_run
/// use context_engine::pipeline::ContextPipeline;
/// use context_engine::pipeline::processors::{ReactionFeedbackProcessor, PageEditorContextInjector};
///
/// let pipeline = ContextPipeline::new()
///     .register(Box::new(ReactionFeedbackProcessor::new()))
///     .register(Box::new(PageEditorContextInjector::new()));
///
/// // let output = pipeline.execute(context).await?;
/// ```
pub struct ContextPipeline {
    /// Registered processors (executed in order)
    processors: Vec<Box<dyn Processor>>,

    /// Pipeline configuration
    config: PipelineConfig,
}

/// Pipeline Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Measure per-stage durations (stages are recorded either way)
    pub enable_timing: bool,

    /// Enable detailed logging
    pub enable_logging: bool,

    /// Maximum processing time in milliseconds (0 = no limit)
    pub max_processing_time_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_timing: true,
            enable_logging: false,
            max_processing_time_ms: 0,
        }
    }
}

impl ContextPipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            processors: Vec::new(),
            config,
        }
    }

    /// Register a processor (chainable)
    ///
    /// Processors are executed in the order they are registered.
    pub fn register(mut self, processor: Box<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Execute the pipeline on a context
    ///
    /// # Returns
    ///
    /// - `Ok(PipelineOutput)` - Processing completed or was aborted by a processor
    /// - `Err(PipelineError)` - A processor failed, or the run timed out
    pub async fn execute(&self, context: PipelineContext) -> Result<PipelineOutput, PipelineError> {
        self.execute_with_cancel(context, &CancellationToken::new())
            .await
    }

    /// Execute the pipeline, stopping as soon as `cancel` fires
    ///
    /// Cancellation drops every intermediate context. Processors perform no
    /// external side effects, so there is nothing to roll back.
    pub async fn execute_with_cancel(
        &self,
        context: PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        if self.processors.is_empty() {
            return Err(PipelineError::NoProcessors);
        }

        let pipeline_start = Instant::now();
        let deadline = (self.config.max_processing_time_ms > 0).then(|| {
            tokio::time::Instant::now() + Duration::from_millis(self.config.max_processing_time_ms)
        });
        let mut ctx = context;
        let mut stats = ProcessingStats::default();

        for processor in &self.processors {
            let name = processor.name();

            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    processor: name.to_string(),
                });
            }

            if self.config.enable_logging {
                tracing::debug!(processor = name, messages = ctx.len(), "Running processor");
            }

            // Time the processor
            let start = Instant::now();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(processor = name, "Pipeline cancelled");
                    return Err(PipelineError::Cancelled { processor: name.to_string() });
                }
                _ = wait_for_deadline(deadline) => {
                    return Err(PipelineError::Timeout { limit_ms: self.config.max_processing_time_ms });
                }
                result = processor.process(&ctx) => result,
            };

            let next = result.map_err(|error| {
                tracing::warn!(processor = name, error = %error, "Processor failed");
                PipelineError::ProcessorFailed {
                    processor: name.to_string(),
                    error,
                }
            })?;

            // Every stage is logged; durations only when timing is enabled
            let duration_ms = if self.config.enable_timing {
                start.elapsed().as_millis() as u64
            } else {
                0
            };
            stats.record_processor(name.to_string(), duration_ms);

            // Check timeout
            if self.config.max_processing_time_ms > 0 {
                let total_elapsed = pipeline_start.elapsed().as_millis() as u64;
                if total_elapsed > self.config.max_processing_time_ms {
                    return Err(PipelineError::Timeout {
                        limit_ms: self.config.max_processing_time_ms,
                    });
                }
            }

            ctx = next;

            if ctx.is_aborted() {
                let reason = ctx.abort_reason().unwrap_or_default().to_string();
                tracing::debug!(processor = name, reason = %reason, "Pipeline aborted");
                return Ok(PipelineOutput::Aborted {
                    reason,
                    aborted_by: name.to_string(),
                    context: ctx,
                    stats,
                });
            }
        }

        if self.config.enable_logging {
            tracing::debug!(
                processors = stats.processors_run,
                duration_ms = stats.total_duration_ms,
                "Pipeline completed"
            );
        }

        // Pipeline completed successfully
        Ok(PipelineOutput::Completed {
            context: ctx,
            stats,
        })
    }

    /// Get the number of registered processors
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Names of registered processors, in execution order
    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Check if pipeline is empty
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl Default for ContextPipeline {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
