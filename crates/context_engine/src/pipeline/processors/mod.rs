//! Processors
//!
//! This module contains the pipeline stages. Injectors that write into the
//! last user message implement `LastUserContentProvider` as well.

pub mod group_flatten;
pub mod history_compression;
pub mod page_editor_context;
pub mod reaction_feedback;
pub mod tool_state;
pub mod user_memory;

// Re-exports
pub use group_flatten::{GroupFlattenConfig, GroupMessageFlattenProcessor};
pub use history_compression::{HistoryCompressionConfig, HistoryCompressionProcessor};
pub use page_editor_context::{PageEditorConfig, PageEditorContextInjector};
pub use reaction_feedback::{ReactionFeedbackConfig, ReactionFeedbackProcessor};
pub use tool_state::{ToolStateConfig, ToolStateInjector};
pub use user_memory::{UserMemoryConfig, UserMemoryInjector};
