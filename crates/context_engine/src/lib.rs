//! `context_engine` prepares the message array sent to a language model:
//! it threads a conversation history through an ordered chain of processors
//! that flatten, compress, annotate and augment it.

pub mod config;
pub mod pipeline;
pub mod structs;

// Re-export the public API
pub use config::{ConfigError, EngineConfig, ProcessorKind};
pub use pipeline::{
    ContextPipeline, LastUserContentProvider, ModelMessage, PipelineBuilder, PipelineConfig,
    PipelineContext, PipelineError, PipelineOutput, ProcessError, Processor, ProcessingStats,
    RequestInputs,
};
pub use structs::memory::MemoryItem;
pub use structs::message::{ContentPart, Message, MessageContent, Role, ToolCall};
pub use structs::page::{PageContentContext, PageContentFormat, PageSelection};
pub use structs::reaction::EmojiReaction;
pub use structs::todo_list::{TodoItem, TodoItemStatus, TodoList};
