//! Processor Trait
//!
//! This module defines the core trait that all pipeline stages implement.

use super::context::PipelineContext;
use super::error::ProcessError;
use async_trait::async_trait;

/// Processor Trait
///
/// Every stage in the pipeline implements this trait. A stage never sees the
/// caller's context mutably: `process` hands `do_process` an owned clone and
/// returns that clone, marked as executed.
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use context_engine::pipeline::{PipelineContext, ProcessError, Processor};
///
/// struct TagProcessor;
///
/// #[async_trait]
/// impl Processor for TagProcessor {
///     fn name(&self) -> &str {
///         "tag"
///     }
///
///     async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
///         ctx.set_metadata("tagged", true);
///         Ok(ctx)
///     }
/// }
/// ```
#[async_trait]
pub trait Processor: Send + Sync {
    /// Returns the name of this processor (for logging and the executed marker)
    fn name(&self) -> &str;

    /// Check if this processor has anything to do
    ///
    /// Returning `false` turns `process` into a passthrough. Default
    /// implementation always returns true.
    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        true
    }

    /// Stage-specific transformation
    ///
    /// Receives a clone of the input context and may change it freely.
    async fn do_process(&self, ctx: PipelineContext) -> Result<PipelineContext, ProcessError>;

    /// Run this stage on `ctx`
    ///
    /// # Returns
    ///
    /// - `Ok(PipelineContext)` - a new context, with this processor recorded as executed
    /// - `Err(ProcessError)` - the stage failed; no context is produced
    async fn process(&self, ctx: &PipelineContext) -> Result<PipelineContext, ProcessError> {
        let mut next = if self.should_run(ctx) {
            self.do_process(ctx.clone()).await?
        } else {
            tracing::debug!("[{}] not applicable, passing through", self.name());
            ctx.clone()
        };
        next.mark_executed(self.name());
        Ok(next)
    }
}
