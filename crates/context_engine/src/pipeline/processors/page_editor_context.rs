//! Page Editor Context Injector
//!
//! This provider appends the live page-editor state to the last user
//! message, so the model reads the document as it is now rather than a copy
//! captured earlier in the conversation.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::formatters::{format_page_content, format_page_selections};
use crate::pipeline::providers::LastUserContentProvider;
use crate::pipeline::traits::Processor;
use crate::structs::page::{PageContentContext, PageSelection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const PAGE_EDITOR_CONTEXT_INJECTED: &str = "pageEditorContextInjected";
pub const PAGE_SELECTIONS_INJECTED: &str = "pageSelectionsInjected";

/// Page Editor Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageEditorConfig {
    /// Gates whole-document injection; selections are injected regardless
    pub enabled: bool,
}

impl Default for PageEditorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Page Editor Context Injector
///
/// Emits a `<current_page_context>` block holding, in order:
/// 1. the formatted selections, if any
/// 2. the formatted document, if enabled and supplied
///
/// Sections the formatters render as empty are dropped. If nothing is left,
/// or the conversation has no user message, the context passes through.
#[derive(Default)]
pub struct PageEditorContextInjector {
    config: PageEditorConfig,
    page_content: Option<PageContentContext>,
    selections: Vec<PageSelection>,
}

impl PageEditorContextInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PageEditorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_page_content(mut self, page_content: PageContentContext) -> Self {
        self.page_content = Some(page_content);
        self
    }

    pub fn with_selections(mut self, selections: Vec<PageSelection>) -> Self {
        self.selections = selections;
        self
    }

    fn has_page_content(&self) -> bool {
        self.config.enabled && self.page_content.is_some()
    }

    fn has_page_selections(&self) -> bool {
        !self.selections.is_empty()
    }
}

impl LastUserContentProvider for PageEditorContextInjector {
    fn context_tag(&self) -> &'static str {
        "current_page_context"
    }
}

#[async_trait]
impl Processor for PageEditorContextInjector {
    fn name(&self) -> &str {
        "page_editor_context"
    }

    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        self.has_page_content() || self.has_page_selections()
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        if self.find_last_user_message_index(&ctx).is_none() {
            tracing::debug!("[PageEditorContextInjector] no user message, skipping");
            return Ok(ctx);
        }

        let mut sections = Vec::new();
        let mut selections_included = false;

        if self.has_page_selections() {
            let formatted = format_page_selections(&self.selections).map_err(|source| {
                ProcessError::Formatter {
                    formatter: "page_selections",
                    source,
                }
            })?;
            if !formatted.is_empty() {
                sections.push(formatted);
                selections_included = true;
            }
        }

        if let Some(page) = self.page_content.as_ref().filter(|_| self.config.enabled) {
            let formatted =
                format_page_content(page).map_err(|source| ProcessError::Formatter {
                    formatter: "page_content",
                    source,
                })?;
            if !formatted.is_empty() {
                sections.push(formatted);
            }
        }

        if sections.is_empty() {
            tracing::debug!("[PageEditorContextInjector] formatters produced no content, skipping");
            return Ok(ctx);
        }

        if !self.inject_into_last_user(&mut ctx, &sections.join("\n\n")) {
            return Ok(ctx);
        }

        tracing::debug!(
            selections = selections_included,
            "[PageEditorContextInjector] injected page context"
        );
        ctx.set_metadata(PAGE_EDITOR_CONTEXT_INJECTED, true);
        if selections_included {
            ctx.set_metadata(PAGE_SELECTIONS_INJECTED, true);
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::formatters::FormatError;
    use crate::pipeline::providers::{SYSTEM_CONTEXT_END, SYSTEM_CONTEXT_START};
    use crate::structs::message::Message;
    use serde_json::json;

    fn page() -> PageContentContext {
        PageContentContext::markdown("Notes", "Quarterly goals")
    }

    fn last_text(ctx: &PipelineContext) -> String {
        ctx.message(ctx.len() - 1)
            .and_then(|m| m.text())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_injects_page_content_with_envelope() {
        let ctx = PipelineContext::new(vec![Message::user("Summarize this doc")]);
        let injector = PageEditorContextInjector::new().with_page_content(page());

        let output = injector.process(&ctx).await.unwrap();

        let text = last_text(&output);
        assert!(text.starts_with("Summarize this doc\n\n"));
        assert!(text.contains(SYSTEM_CONTEXT_START));
        assert!(text.contains(
            "<current_page_context>\n<page title=\"Notes\" format=\"markdown\">\nQuarterly goals\n</page>\n</current_page_context>"
        ));
        assert_eq!(output.get_metadata(PAGE_EDITOR_CONTEXT_INJECTED), Some(&json!(true)));
        assert!(output.get_metadata(PAGE_SELECTIONS_INJECTED).is_none());
    }

    #[tokio::test]
    async fn test_selections_come_before_page_content() {
        let ctx = PipelineContext::new(vec![Message::user("Fix this")]);
        let injector = PageEditorContextInjector::new()
            .with_page_content(page())
            .with_selections(vec![PageSelection::new("goals").with_lines(1, 1)]);

        let output = injector.process(&ctx).await.unwrap();

        let text = last_text(&output);
        let selection_at = text.find("<user_selections").unwrap();
        let page_at = text.find("<page ").unwrap();
        assert!(selection_at < page_at);
        assert!(text.contains("</user_selections>\n\n<page "));
        assert_eq!(output.get_metadata(PAGE_SELECTIONS_INJECTED), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_disabled_still_injects_selections() {
        let ctx = PipelineContext::new(vec![Message::user("Explain")]);
        let injector = PageEditorContextInjector::with_config(PageEditorConfig { enabled: false })
            .with_page_content(page())
            .with_selections(vec![PageSelection::new("a line")]);

        let output = injector.process(&ctx).await.unwrap();

        let text = last_text(&output);
        assert!(text.contains("<user_selections"));
        assert!(!text.contains("<page "));
    }

    #[tokio::test]
    async fn test_disabled_without_selections_is_passthrough() {
        let ctx = PipelineContext::new(vec![Message::user("Explain")]);
        let injector = PageEditorContextInjector::with_config(PageEditorConfig { enabled: false })
            .with_page_content(page());

        let output = injector.process(&ctx).await.unwrap();

        assert_eq!(output.messages(), ctx.messages());
        assert!(output.get_metadata(PAGE_EDITOR_CONTEXT_INJECTED).is_none());
    }

    #[tokio::test]
    async fn test_existing_envelope_gets_inner_block_only() {
        let ctx = PipelineContext::new(vec![Message::user("Summarize this doc")]);
        let injector = PageEditorContextInjector::new().with_page_content(page());

        let once = injector.process(&ctx).await.unwrap();
        let twice = injector.process(&once).await.unwrap();

        let text = last_text(&twice);
        assert_eq!(text.matches(SYSTEM_CONTEXT_START).count(), 1);
        assert_eq!(text.matches(SYSTEM_CONTEXT_END).count(), 1);
        assert_eq!(text.matches("<current_page_context>").count(), 2);
        assert!(text.ends_with(SYSTEM_CONTEXT_END));
    }

    #[tokio::test]
    async fn test_no_user_message_is_passthrough() {
        let ctx = PipelineContext::new(vec![Message::system("sys"), Message::assistant("hello")]);
        let injector = PageEditorContextInjector::new().with_page_content(page());

        let output = injector.process(&ctx).await.unwrap();

        assert_eq!(output.messages(), ctx.messages());
        assert!(output.get_metadata(PAGE_EDITOR_CONTEXT_INJECTED).is_none());
    }

    #[tokio::test]
    async fn test_blank_sections_are_passthrough() {
        let ctx = PipelineContext::new(vec![Message::user("Explain")]);
        let injector = PageEditorContextInjector::new()
            .with_page_content(PageContentContext::markdown("Empty", "   "))
            .with_selections(vec![PageSelection::new("")]);

        let output = injector.process(&ctx).await.unwrap();

        assert_eq!(last_text(&output), "Explain");
        assert!(output.get_metadata(PAGE_EDITOR_CONTEXT_INJECTED).is_none());
    }

    #[tokio::test]
    async fn test_formatter_failure_is_fatal() {
        let ctx = PipelineContext::new(vec![Message::user("Explain")]);
        let injector = PageEditorContextInjector::new()
            .with_selections(vec![PageSelection::new("x").with_lines(4, 1)]);

        let err = injector.process(&ctx).await.unwrap_err();

        match err {
            ProcessError::Formatter { formatter, source } => {
                assert_eq!(formatter, "page_selections");
                assert_eq!(source, FormatError::InvalidRange { index: 0, start: 4, end: 1 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(last_text(&ctx), "Explain");
    }

    #[tokio::test]
    async fn test_targets_last_user_message_only() {
        let ctx = PipelineContext::new(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
            Message::assistant("pending"),
        ]);
        let injector = PageEditorContextInjector::new().with_page_content(page());

        let output = injector.process(&ctx).await.unwrap();

        assert_eq!(output.message(0).unwrap().text(), Some("first"));
        assert!(output.message(2).unwrap().text().unwrap().contains("<current_page_context>"));
        assert_eq!(output.message(3).unwrap().text(), Some("pending"));
    }
}
