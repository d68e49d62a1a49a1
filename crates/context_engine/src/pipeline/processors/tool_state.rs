//! Tool State Injector
//!
//! Appends the state kept by stateful tools (the todo list) to the last user
//! message, so the model plans against the current task list.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::formatters::format_todo_list;
use crate::pipeline::providers::LastUserContentProvider;
use crate::pipeline::traits::Processor;
use crate::structs::todo_list::TodoList;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TOOL_STATE_INJECTED: &str = "toolStateInjected";

/// Tool State Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStateConfig {
    pub enabled: bool,
}

impl Default for ToolStateConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Tool State Injector
#[derive(Default)]
pub struct ToolStateInjector {
    config: ToolStateConfig,
    todo_list: Option<TodoList>,
}

impl ToolStateInjector {
    pub fn new(todo_list: Option<TodoList>) -> Self {
        Self {
            config: ToolStateConfig::default(),
            todo_list,
        }
    }

    pub fn with_config(config: ToolStateConfig, todo_list: Option<TodoList>) -> Self {
        Self { config, todo_list }
    }
}

impl LastUserContentProvider for ToolStateInjector {
    fn context_tag(&self) -> &'static str {
        "tool_state"
    }
}

#[async_trait]
impl Processor for ToolStateInjector {
    fn name(&self) -> &str {
        "tool_state"
    }

    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        self.config.enabled && self.todo_list.as_ref().is_some_and(|list| !list.items.is_empty())
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        let Some(list) = self.todo_list.as_ref() else {
            return Ok(ctx);
        };

        if self.inject_into_last_user(&mut ctx, &format_todo_list(list)) {
            tracing::debug!(items = list.items.len(), "[ToolStateInjector] injected todo list");
            ctx.set_metadata(TOOL_STATE_INJECTED, true);
        }
        Ok(ctx)
    }
}
