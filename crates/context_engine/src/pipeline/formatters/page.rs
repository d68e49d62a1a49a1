use super::{FormatError, escape_attr};
use crate::structs::page::{PageContentContext, PageSelection};

/// Render the user's active selections.
///
/// Blank selections are skipped; if none remain the result is empty.
pub fn format_page_selections(selections: &[PageSelection]) -> Result<String, FormatError> {
    let mut rendered = Vec::new();

    for (index, selection) in selections.iter().enumerate() {
        let text = selection.text.trim();
        if text.is_empty() {
            continue;
        }

        let lines = match (selection.start_line, selection.end_line) {
            (Some(start), Some(end)) if start > end => {
                return Err(FormatError::InvalidRange { index, start, end });
            }
            (Some(start), Some(end)) if start == end => format!(" lines=\"{start}\""),
            (Some(start), Some(end)) => format!(" lines=\"{start}-{end}\""),
            (Some(start), None) | (None, Some(start)) => format!(" lines=\"{start}\""),
            (None, None) => String::new(),
        };

        rendered.push(format!(
            "<selection index=\"{}\"{lines}>\n{text}\n</selection>",
            rendered.len() + 1
        ));
    }

    if rendered.is_empty() {
        return Ok(String::new());
    }

    Ok(format!(
        "<user_selections count=\"{}\">\n{}\n</user_selections>",
        rendered.len(),
        rendered.join("\n")
    ))
}

/// Render the current document body.
///
/// A blank body renders as empty. A format whose body is missing is an error:
/// the editor promised content it did not deliver.
pub fn format_page_content(page: &PageContentContext) -> Result<String, FormatError> {
    let body = page.body().ok_or(FormatError::MissingBody {
        format: page.format.as_str(),
    })?;
    let body = body.trim();
    if body.is_empty() {
        return Ok(String::new());
    }

    let mut attrs = String::new();
    if let Some(title) = page.title.as_deref().filter(|t| !t.trim().is_empty()) {
        attrs.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    if let Some(page_id) = page.page_id.as_deref() {
        attrs.push_str(&format!(" id=\"{}\"", escape_attr(page_id)));
    }
    attrs.push_str(&format!(" format=\"{}\"", page.format.as_str()));

    Ok(format!("<page{attrs}>\n{body}\n</page>"))
}
