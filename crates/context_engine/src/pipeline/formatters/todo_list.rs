use crate::structs::todo_list::TodoList;

/// Render the todo list the way the todo tool reports it.
pub fn format_todo_list(list: &TodoList) -> String {
    if list.items.is_empty() {
        return String::new();
    }

    let mut output = format!("## Current Task List: {}\n", list.title);

    for item in &list.items {
        output.push_str(&format!("\n{} {}: {}", item.status.icon(), item.id, item.description));

        if !item.notes.is_empty() {
            output.push_str(&format!("\n    Notes: {}", item.notes.replace('\n', "\n    ")));
        }
    }

    output.push_str(&format!(
        "\n\nProgress: {}/{} tasks completed",
        list.completed_count(),
        list.items.len()
    ));

    output
}
