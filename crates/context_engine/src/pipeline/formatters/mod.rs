//! Content Formatters
//!
//! Render side-channel context (page state, selections, memories, tool
//! state) into the text blocks injected into the last user message. A
//! formatter returning an empty string means "nothing to inject".

use thiserror::Error;

pub mod memory;
pub mod page;
pub mod todo_list;

pub use memory::format_user_memories;
pub use page::{format_page_content, format_page_selections};
pub use todo_list::format_todo_list;

/// Errors raised while rendering a context section.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The declared format has no body supplied
    #[error("page declares {format} content but no {format} body was supplied")]
    MissingBody { format: &'static str },

    /// A selection range ends before it starts
    #[error("selection {index} has invalid line range {start}-{end}")]
    InvalidRange { index: usize, start: u32, end: u32 },
}

/// Escape a value for use inside a double-quoted XML attribute.
pub(crate) fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
