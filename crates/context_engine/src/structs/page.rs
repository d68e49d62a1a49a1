use serde::{Deserialize, Serialize};

/// Serialization the editor used for the page body.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageContentFormat {
    #[default]
    Markdown,
    Xml,
}

impl PageContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageContentFormat::Markdown => "markdown",
            PageContentFormat::Xml => "xml",
        }
    }
}

/// Live state of the document the user is editing, captured at request time.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageContentContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub format: PageContentFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
}

impl PageContentContext {
    pub fn markdown(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            format: PageContentFormat::Markdown,
            markdown: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn xml(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            format: PageContentFormat::Xml,
            xml: Some(body.into()),
            ..Default::default()
        }
    }

    /// Body matching the declared format, if one was supplied.
    pub fn body(&self) -> Option<&str> {
        match self.format {
            PageContentFormat::Markdown => self.markdown.as_deref(),
            PageContentFormat::Xml => self.xml.as_deref(),
        }
    }
}

/// A text range the user selected in the editor.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
}

impl PageSelection {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_lines(mut self, start_line: u32, end_line: u32) -> Self {
        self.start_line = Some(start_line);
        self.end_line = Some(end_line);
        self
    }
}
