//! Pipeline Context
//!
//! This module defines the value threaded through the pipeline.

use crate::pipeline::error::ProcessError;
use crate::structs::message::{ContentPart, Message, MessageContent, Role, ToolCall};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metadata key listing every processor that ran, in order.
pub const EXECUTED_PROCESSORS_KEY: &str = "executedProcessors";

/// Pipeline Context
///
/// Holds the messages being prepared for the model plus an audit trail of
/// what each processor did.
///
/// Messages are shared behind `Arc`, so cloning a context copies pointers
/// only. A processor that changes a message swaps in a new `Arc`; the
/// caller's copy keeps pointing at the original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    messages: Vec<Arc<Message>>,

    /// Audit trail written by processors (e.g. `reactionFeedbackProcessed`)
    pub metadata: BTreeMap<String, Value>,

    is_aborted: bool,
    abort_reason: Option<String>,
}

impl PipelineContext {
    /// Create a context from persisted conversation messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().map(Arc::new).collect(),
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index).map(Arc::as_ref)
    }

    /// Replace the message at `index` with a new message object.
    ///
    /// Returns false if `index` is out of range.
    pub fn replace_message(&mut self, index: usize, message: Message) -> bool {
        match self.messages.get_mut(index) {
            Some(slot) => {
                *slot = Arc::new(message);
                true
            }
            None => false,
        }
    }

    /// Replace the whole message list, reusing shared messages where possible.
    pub fn set_messages(&mut self, messages: Vec<Arc<Message>>) {
        self.messages = messages;
    }

    /// Take the message list out of the context.
    pub fn take_messages(&mut self) -> Vec<Arc<Message>> {
        std::mem::take(&mut self.messages)
    }

    /// Consume the context, returning owned messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect()
    }

    /// Add metadata
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Get metadata
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Record that `processor` ran on this context
    pub fn mark_executed(&mut self, processor: &str) {
        let entry = self
            .metadata
            .entry(EXECUTED_PROCESSORS_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(names) => names.push(Value::String(processor.to_string())),
            other => *other = Value::Array(vec![Value::String(processor.to_string())]),
        }
    }

    /// Names of processors that have run, oldest first
    pub fn executed_processors(&self) -> Vec<&str> {
        self.metadata
            .get(EXECUTED_PROCESSORS_KEY)
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Stop the pipeline after the current processor
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.is_aborted = true;
        self.abort_reason = Some(reason.into());
    }

    pub fn is_aborted(&self) -> bool {
        self.is_aborted
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Build the message array for the model-invocation boundary.
    ///
    /// Ids, metadata and group children are dropped. An `assistantGroup`
    /// message still present here cannot be sent and is reported as
    /// malformed input.
    pub fn to_payload(&self) -> Result<Vec<ModelMessage>, ProcessError> {
        self.messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let role = match message.role {
                    Role::System => PayloadRole::System,
                    Role::User => PayloadRole::User,
                    Role::Assistant => PayloadRole::Assistant,
                    Role::Tool => PayloadRole::Tool,
                    Role::AssistantGroup => {
                        return Err(ProcessError::malformed(format!(
                            "message {index} is an unflattened assistantGroup"
                        )));
                    }
                };
                Ok(ModelMessage {
                    role,
                    content: message.content.clone(),
                    tool_calls: message.tool_calls.clone(),
                    tool_call_id: message.tool_call_id.clone(),
                })
            })
            .collect()
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the shape the chat-completions API accepts.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ModelMessage {
    pub role: PayloadRole,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    /// Concatenated text of this message, for logging and tests.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
