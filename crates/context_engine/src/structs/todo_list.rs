use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TodoItemStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TodoItemStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            TodoItemStatus::Pending => "[ ]",
            TodoItemStatus::InProgress => "[/]",
            TodoItemStatus::Completed => "[x]",
            TodoItemStatus::Blocked => "[!]",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TodoItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub status: TodoItemStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl TodoItem {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: TodoItemStatus::Pending,
            notes: String::new(),
        }
    }

    pub fn with_status(mut self, status: TodoItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Task list maintained by the todo tool; injected as tool state.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TodoList {
    pub title: String,
    #[serde(default)]
    pub items: Vec<TodoItem>,
}

impl TodoList {
    pub fn new(title: impl Into<String>, items: Vec<TodoItem>) -> Self {
        Self {
            title: title.into(),
            items,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == TodoItemStatus::Completed)
            .count()
    }
}
