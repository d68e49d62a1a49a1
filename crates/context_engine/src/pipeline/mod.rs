//! Context Pipeline
//!
//! This module turns a conversation history plus side-channel context into
//! the message array sent to the model. Each processor receives the context
//! produced by the previous one and returns a new one; the caller's context
//! is never modified.
//!
//! # Architecture
//!
//! ```text
//! Messages → [GroupFlatten] → [HistoryCompression] → [ReactionFeedback]
//!          → [ToolState] → [UserMemory] → [PageEditorContext] → payload
//!                              ↓               ↓                ↓
//!                        last user message: one system-context envelope
//! ```
//!
//! # Example
//!
//! ```no_run
//! use context_engine::pipeline::{ContextPipeline, PipelineContext};
//! use context_engine::pipeline::processors::ReactionFeedbackProcessor;
//!
//! let pipeline = ContextPipeline::new()
//!     .register(Box::new(ReactionFeedbackProcessor::new()));
//!
//! // let output = pipeline.execute(PipelineContext::new(messages)).await?;
//! // let payload = output.context().to_payload()?;
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod formatters;
pub mod pipeline;
pub mod processors;
pub mod providers;
pub mod result;
pub mod traits;

// Re-exports for convenience
pub use builder::{PipelineBuilder, RequestInputs};
pub use context::{ModelMessage, PayloadRole, PipelineContext};
pub use error::{PipelineError, ProcessError};
pub use pipeline::{ContextPipeline, PipelineConfig};
pub use providers::LastUserContentProvider;
pub use result::{PipelineOutput, ProcessingStats};
pub use traits::Processor;
