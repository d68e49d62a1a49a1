//! Pipeline assembly from configuration.

use super::pipeline::ContextPipeline;
use super::processors::{
    GroupMessageFlattenProcessor, HistoryCompressionProcessor, PageEditorContextInjector,
    ReactionFeedbackProcessor, ToolStateInjector, UserMemoryInjector,
};
use super::traits::Processor;
use crate::config::{ConfigError, EngineConfig, ProcessorKind};
use crate::structs::memory::MemoryItem;
use crate::structs::page::{PageContentContext, PageSelection};
use crate::structs::todo_list::TodoList;

/// Per-request side-channel data consumed by the providers.
#[derive(Debug, Clone, Default)]
pub struct RequestInputs {
    pub page_content: Option<PageContentContext>,
    pub page_selections: Vec<PageSelection>,
    pub memories: Vec<MemoryItem>,
    pub todo_list: Option<TodoList>,
    pub history_summary: Option<String>,
}

/// Builds a `ContextPipeline` whose stages follow `EngineConfig::order`.
pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn build(config: &EngineConfig, inputs: RequestInputs) -> Result<ContextPipeline, ConfigError> {
        config.validate()?;

        // Validation rejects duplicates, so each input is taken at most once.
        let RequestInputs {
            mut page_content,
            mut page_selections,
            mut memories,
            mut todo_list,
            mut history_summary,
        } = inputs;

        let mut pipeline = ContextPipeline::with_config(config.pipeline.clone());
        for kind in &config.order {
            let processor: Box<dyn Processor> = match kind {
                ProcessorKind::GroupFlatten => Box::new(GroupMessageFlattenProcessor::with_config(
                    config.group_flatten.clone(),
                )),
                ProcessorKind::HistoryCompression => {
                    let processor =
                        HistoryCompressionProcessor::new(config.history_compression.clone());
                    match history_summary.take() {
                        Some(summary) => Box::new(processor.with_summary(summary)),
                        None => Box::new(processor),
                    }
                }
                ProcessorKind::ReactionFeedback => Box::new(ReactionFeedbackProcessor::with_config(
                    config.reaction_feedback.clone(),
                )),
                ProcessorKind::ToolState => Box::new(ToolStateInjector::with_config(
                    config.tool_state.clone(),
                    todo_list.take(),
                )),
                ProcessorKind::UserMemory => Box::new(UserMemoryInjector::with_config(
                    config.user_memory.clone(),
                    std::mem::take(&mut memories),
                )),
                ProcessorKind::PageEditorContext => {
                    let mut injector =
                        PageEditorContextInjector::with_config(config.page_editor.clone())
                            .with_selections(std::mem::take(&mut page_selections));
                    if let Some(page) = page_content.take() {
                        injector = injector.with_page_content(page);
                    }
                    Box::new(injector)
                }
            };
            pipeline = pipeline.register(processor);
        }

        tracing::debug!(
            processors = pipeline.processor_count(),
            "[PipelineBuilder] assembled pipeline"
        );
        Ok(pipeline)
    }
}

impl ContextPipeline {
    /// Shorthand for [`PipelineBuilder::build`].
    pub fn from_config(config: &EngineConfig, inputs: RequestInputs) -> Result<Self, ConfigError> {
        PipelineBuilder::build(config, inputs)
    }
}
