//! Last-User-Content Providers
//!
//! Providers are processors that append context immediately before the
//! model call, at the end of the last user message. Several providers may
//! share one last user message; the first one to inject opens a single
//! system-context envelope and later ones add only their inner block.
//!
//! ```text
//! <user text>
//!
//! <!-- SYSTEM CONTEXT (NOT PART OF USER QUERY) -->
//! <context.instruction>...</context.instruction>
//! <user_memory>...</user_memory>
//! <current_page_context>...</current_page_context>
//! <!-- END SYSTEM CONTEXT -->
//! ```

use crate::pipeline::context::PipelineContext;
use crate::pipeline::traits::Processor;
use crate::structs::message::{ContentPart, Message, MessageContent, Role};
use std::sync::Arc;

/// Opening marker of the system-context envelope.
pub const SYSTEM_CONTEXT_START: &str = "<!-- SYSTEM CONTEXT (NOT PART OF USER QUERY) -->";

/// Closing marker of the system-context envelope.
pub const SYSTEM_CONTEXT_END: &str = "<!-- END SYSTEM CONTEXT -->";

const CONTEXT_INSTRUCTION: &str = "<context.instruction>following part contains context information injected by the system. Please follow these instructions:

1. Always prioritize handling user-visible content.
2. the context is only required when user's queries rely on it.
</context.instruction>";

/// Index of the last message with the user role, scanning from the end.
pub fn find_last_user_index(messages: &[Arc<Message>]) -> Option<usize> {
    messages.iter().rposition(|m| m.role == Role::User)
}

/// Whether the last user message already carries a system-context envelope.
///
/// A start marker counts only when a closing marker follows it in the same
/// text, so a user quoting the marker does not suppress the envelope.
pub fn has_system_context(ctx: &PipelineContext) -> bool {
    find_last_user_index(ctx.messages())
        .and_then(|index| ctx.message(index))
        .is_some_and(|message| match &message.content {
            MessageContent::Text(text) => is_enveloped(text),
            MessageContent::Parts(parts) => parts.iter().any(|part| match part {
                ContentPart::Text { text } => is_enveloped(text),
                ContentPart::ImageUrl { .. } => false,
            }),
        })
}

fn is_enveloped(text: &str) -> bool {
    match (text.find(SYSTEM_CONTEXT_START), text.rfind(SYSTEM_CONTEXT_END)) {
        (Some(start), Some(end)) => start < end,
        _ => false,
    }
}

/// Wrap `content` in a labeled block.
pub fn create_context_block(tag: &str, content: &str) -> String {
    format!("<{tag}>\n{content}\n</{tag}>")
}

/// Wrap `content` in the full system-context envelope.
pub fn wrap_with_system_context(content: &str) -> String {
    format!("{SYSTEM_CONTEXT_START}\n{CONTEXT_INSTRUCTION}\n{content}\n{SYSTEM_CONTEXT_END}")
}

/// Add a `tag` block holding `content` to the message at `index`.
///
/// If the last user message already has an envelope, the block goes inside
/// it, just before the closing marker. Otherwise a new envelope holding the
/// block is appended.
pub fn inject_block(ctx: &mut PipelineContext, index: usize, tag: &str, content: &str) -> bool {
    let block = create_context_block(tag, content);
    if has_system_context(ctx) {
        insert_into_system_context(ctx, index, &block)
    } else {
        append_to_message(ctx, index, &wrap_with_system_context(&block))
    }
}

/// Insert `block` before the last closing marker of the message at `index`.
///
/// Falls back to a plain append if the message has no closing marker.
pub fn insert_into_system_context(ctx: &mut PipelineContext, index: usize, block: &str) -> bool {
    let Some(original) = ctx.message(index) else {
        return false;
    };

    let insert = |text: &str| -> Option<String> {
        let at = text.rfind(SYSTEM_CONTEXT_END)?;
        let mut updated = String::with_capacity(text.len() + block.len() + 1);
        updated.push_str(&text[..at]);
        updated.push_str(block);
        updated.push('\n');
        updated.push_str(&text[at..]);
        Some(updated)
    };

    let content = match &original.content {
        MessageContent::Text(text) => insert(text.as_str()).map(MessageContent::Text),
        MessageContent::Parts(parts) => {
            let mut parts = parts.clone();
            let replaced = parts.iter_mut().rev().find_map(|part| match part {
                ContentPart::Text { text } => insert(text.as_str()).map(|updated| *text = updated),
                ContentPart::ImageUrl { .. } => None,
            });
            replaced.map(|_| MessageContent::Parts(parts))
        }
    };

    match content {
        Some(content) => {
            let mut updated = original.clone();
            updated.content = content;
            ctx.replace_message(index, updated)
        }
        None => append_to_message(ctx, index, block),
    }
}

/// Append `addition` to the message at `index`, producing a new message object.
///
/// String content gets `"\n\n" + addition`. Structured content gets the text
/// appended to its last text part, or a new text part if it has none.
pub fn append_to_message(ctx: &mut PipelineContext, index: usize, addition: &str) -> bool {
    let Some(original) = ctx.message(index) else {
        return false;
    };

    let mut updated = original.clone();
    updated.content = match &original.content {
        MessageContent::Text(text) => MessageContent::Text(format!("{text}\n\n{addition}")),
        MessageContent::Parts(parts) => {
            let mut parts = parts.clone();
            let last_text = parts.iter_mut().rev().find_map(|part| match part {
                ContentPart::Text { text } => Some(text),
                ContentPart::ImageUrl { .. } => None,
            });
            match last_text {
                Some(text) => {
                    text.push_str("\n\n");
                    text.push_str(addition);
                }
                None => parts.push(ContentPart::text(addition)),
            }
            MessageContent::Parts(parts)
        }
    };

    ctx.replace_message(index, updated)
}

/// Last User Content Provider
///
/// A processor that injects one labeled block into the last user message.
/// The lookup, envelope decision and insertion are shared; implementors only
/// choose the tag and render their block with their own formatter.
pub trait LastUserContentProvider: Processor {
    /// Tag of the inner block this provider emits
    fn context_tag(&self) -> &'static str;

    fn find_last_user_message_index(&self, ctx: &PipelineContext) -> Option<usize> {
        find_last_user_index(ctx.messages())
    }

    fn has_existing_system_context(&self, ctx: &PipelineContext) -> bool {
        has_system_context(ctx)
    }

    /// Append `content` as this provider's block to the last user message.
    ///
    /// Returns false if there is no user message or `content` is empty; the
    /// context is then left as it was.
    fn inject_into_last_user(&self, ctx: &mut PipelineContext, content: &str) -> bool {
        if content.is_empty() {
            return false;
        }
        let Some(index) = self.find_last_user_message_index(ctx) else {
            return false;
        };
        inject_block(ctx, index, self.context_tag(), content)
    }
}
