use super::escape_attr;
use crate::structs::memory::MemoryItem;

/// Memories that render to something; blank items are skipped.
pub fn renderable_memories(memories: &[MemoryItem]) -> impl Iterator<Item = &MemoryItem> {
    memories
        .iter()
        .filter(|memory| !memory.summary.trim().is_empty() || !memory.title.trim().is_empty())
}

/// Render up to `max_items` memories, most relevant first as supplied.
pub fn format_user_memories(memories: &[MemoryItem], max_items: usize) -> String {
    let lines: Vec<String> = renderable_memories(memories)
        .take(max_items)
        .map(|memory| {
            let mut attrs = String::new();
            if let Some(category) = memory.category.as_deref() {
                attrs.push_str(&format!(" category=\"{}\"", escape_attr(category)));
            }
            if let Some(updated_at) = memory.updated_at {
                attrs.push_str(&format!(" updated=\"{}\"", updated_at.format("%Y-%m-%d")));
            }
            let title = memory.title.trim();
            let summary = memory.summary.trim();
            let body = match (title.is_empty(), summary.is_empty()) {
                (false, false) => format!("{title}: {summary}"),
                (true, _) => summary.to_string(),
                (_, true) => title.to_string(),
            };
            format!("<memory{attrs}>{body}</memory>")
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    format!(
        "<user_memories count=\"{}\">\n{}\n</user_memories>",
        lines.len(),
        lines.join("\n")
    )
}
