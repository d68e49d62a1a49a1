//! User Memory Injector
//!
//! Appends remembered facts about the user to the last user message.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::formatters::memory::{format_user_memories, renderable_memories};
use crate::pipeline::providers::LastUserContentProvider;
use crate::pipeline::traits::Processor;
use crate::structs::memory::MemoryItem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const USER_MEMORY_INJECTED: &str = "userMemoryInjected";

/// User Memory Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMemoryConfig {
    pub enabled: bool,

    /// Maximum number of memories rendered
    pub max_items: usize,
}

impl Default for UserMemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: 20,
        }
    }
}

/// User Memory Injector
///
/// Emits a `<user_memory>` block. Memories are rendered in the order the
/// memory subsystem supplied them, truncated to `max_items`.
#[derive(Default)]
pub struct UserMemoryInjector {
    config: UserMemoryConfig,
    memories: Vec<MemoryItem>,
}

impl UserMemoryInjector {
    pub fn new(memories: Vec<MemoryItem>) -> Self {
        Self {
            config: UserMemoryConfig::default(),
            memories,
        }
    }

    pub fn with_config(config: UserMemoryConfig, memories: Vec<MemoryItem>) -> Self {
        Self { config, memories }
    }
}

impl LastUserContentProvider for UserMemoryInjector {
    fn context_tag(&self) -> &'static str {
        "user_memory"
    }
}

#[async_trait]
impl Processor for UserMemoryInjector {
    fn name(&self) -> &str {
        "user_memory"
    }

    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        self.config.enabled && self.config.max_items > 0 && !self.memories.is_empty()
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        let rendered = format_user_memories(&self.memories, self.config.max_items);
        if !self.inject_into_last_user(&mut ctx, &rendered) {
            tracing::debug!("[UserMemoryInjector] nothing injected");
            return Ok(ctx);
        }

        let injected = renderable_memories(&self.memories)
            .take(self.config.max_items)
            .count();
        tracing::debug!("[UserMemoryInjector] injected {injected} memories");
        ctx.set_metadata(USER_MEMORY_INJECTED, injected);
        Ok(ctx)
    }
}
