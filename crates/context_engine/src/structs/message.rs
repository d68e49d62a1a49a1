use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Metadata key under which a message carries its emoji reactions.
pub const REACTIONS_KEY: &str = "reactions";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    /// An assistant turn made of several assistant/tool steps, stored in `children`.
    AssistantGroup,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message content as the model API accepts it: a plain string or a list of parts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Returns the string content, or `None` for structured content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }

    /// Returns true if the content contains `needle` in its string or in any text part.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            MessageContent::Text(text) => text.contains(needle),
            MessageContent::Parts(parts) => parts.iter().any(|part| match part {
                ContentPart::Text { text } => text.contains(needle),
                ContentPart::ImageUrl { .. } => false,
            }),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(value: Vec<ContentPart>) -> Self {
        MessageContent::Parts(value)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A chat message as handed to the pipeline by the conversation store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub content: MessageContent,

    /// If present, indicates this Assistant message is requesting tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// If present, indicates this Tool message answers the given tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Free-form metadata bag (reactions, timestamps, UI data, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Steps of an `AssistantGroup` message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Message>,
}

fn generate_id() -> Option<String> {
    Some(Uuid::new_v4().to_string())
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: generate_id(),
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            metadata: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut message = Self::new(Role::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    pub fn assistant_group(children: Vec<Message>) -> Self {
        let mut message = Self::new(Role::AssistantGroup, String::new());
        message.children = children;
        message
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_reactions(self, reactions: &[crate::structs::reaction::EmojiReaction]) -> Self {
        let value = serde_json::to_value(reactions).unwrap_or(Value::Null);
        self.with_metadata(REACTIONS_KEY, value)
    }

    /// Returns the string content, if this message has plain text content.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// Ids of the tool calls this message issues or answers.
    pub fn tool_call_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .tool_calls
            .iter()
            .flatten()
            .map(|call| call.id.as_str())
            .collect();
        if let Some(id) = self.tool_call_id.as_deref() {
            ids.push(id);
        }
        ids
    }
}
