//! Group Message Flatten Processor
//!
//! The conversation store keeps a multi-step assistant turn as one
//! `assistantGroup` message whose children are the individual assistant and
//! tool messages. The model API has no such role, so groups are expanded
//! back into their steps.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::traits::Processor;
use crate::structs::message::{Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ASSISTANT_GROUPS_FLATTENED: &str = "assistantGroupsFlattened";

/// Group Flatten Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupFlattenConfig {
    pub enabled: bool,
}

impl Default for GroupFlattenConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Group Message Flatten Processor
///
/// Replaces each group with its children, in order. The group's own metadata
/// (reactions in particular) moves to the last assistant child, without
/// overwriting keys the child already has, so a non-empty group needs at
/// least one assistant child. A group with no children becomes a plain
/// assistant message.
#[derive(Default)]
pub struct GroupMessageFlattenProcessor {
    config: GroupFlattenConfig,
}

impl GroupMessageFlattenProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GroupFlattenConfig) -> Self {
        Self { config }
    }

    fn flatten_group(index: usize, group: &Message) -> Result<Vec<Message>, ProcessError> {
        if group.children.is_empty() {
            let mut message = group.clone();
            message.role = Role::Assistant;
            return Ok(vec![message]);
        }

        if let Some(child) = group
            .children
            .iter()
            .find(|child| !matches!(child.role, Role::Assistant | Role::Tool))
        {
            return Err(ProcessError::malformed(format!(
                "assistantGroup at {index} contains a {:?} child",
                child.role
            )));
        }

        let mut children = group.children.clone();
        let Some(last_assistant) = children.iter_mut().rev().find(|c| c.role == Role::Assistant)
        else {
            return Err(ProcessError::malformed(format!(
                "assistantGroup at {index} has no assistant child"
            )));
        };
        for (key, value) in &group.metadata {
            last_assistant
                .metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(children)
    }
}

#[async_trait]
impl Processor for GroupMessageFlattenProcessor {
    fn name(&self) -> &str {
        "group_flatten"
    }

    fn should_run(&self, ctx: &PipelineContext) -> bool {
        self.config.enabled && ctx.messages().iter().any(|m| m.role == Role::AssistantGroup)
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        let mut flattened = 0usize;
        let mut messages = Vec::with_capacity(ctx.len());

        for (index, message) in ctx.take_messages().into_iter().enumerate() {
            if message.role != Role::AssistantGroup {
                messages.push(message);
                continue;
            }
            messages.extend(
                Self::flatten_group(index, &message)?
                    .into_iter()
                    .map(Arc::new),
            );
            flattened += 1;
        }

        tracing::debug!("[GroupMessageFlattenProcessor] flattened {flattened} group(s)");
        ctx.set_messages(messages);
        ctx.set_metadata(ASSISTANT_GROUPS_FLATTENED, flattened);
        Ok(ctx)
    }
}
