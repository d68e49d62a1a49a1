use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remembered fact about the user, produced by the memory subsystem.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryItem {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            category: None,
            title: title.into(),
            summary: summary.into(),
            updated_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}
