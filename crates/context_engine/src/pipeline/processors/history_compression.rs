//! History Compression Processor
//!
//! Keeps the conversation within a recent window and puts the compressed
//! summary of older turns in front of it.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::providers::create_context_block;
use crate::pipeline::traits::Processor;
use crate::structs::message::{Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const HISTORY_COMPRESSED: &str = "historyCompressed";
pub const HISTORY_SUMMARY_INJECTED: &str = "historySummaryInjected";

/// History Compression Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryCompressionConfig {
    /// Opt-in; when false the full history is sent
    pub enabled: bool,

    /// Number of most recent non-system messages to keep (at least 1)
    pub keep_recent: usize,
}

impl Default for HistoryCompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            keep_recent: 20,
        }
    }
}

/// History Compression Processor
///
/// # Algorithm
///
/// 1. System messages are always kept, in place
/// 2. Of the remaining messages, the last `keep_recent` are kept
/// 3. If the window would start on a tool result, it is widened back to the
///    assistant message that issued the call, so no result loses its call
/// 4. A supplied summary is inserted as a system message right after the
///    leading system messages
pub struct HistoryCompressionProcessor {
    config: HistoryCompressionConfig,
    summary: Option<String>,
}

impl HistoryCompressionProcessor {
    pub fn new(config: HistoryCompressionConfig) -> Self {
        Self {
            config,
            summary: None,
        }
    }

    /// Summary of earlier turns produced by the summarizer
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Indices into `messages` of the conversational messages to drop.
    fn dropped_indices(&self, messages: &[Arc<Message>]) -> Vec<usize> {
        let conversational: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role != Role::System)
            .map(|(index, _)| index)
            .collect();

        let keep = self.config.keep_recent.max(1);
        if conversational.len() <= keep {
            return Vec::new();
        }

        let mut cut = conversational.len() - keep;
        while cut > 0 && messages[conversational[cut]].role == Role::Tool {
            cut -= 1;
        }

        conversational[..cut].to_vec()
    }
}

impl Default for HistoryCompressionProcessor {
    fn default() -> Self {
        Self::new(HistoryCompressionConfig::default())
    }
}

#[async_trait]
impl Processor for HistoryCompressionProcessor {
    fn name(&self) -> &str {
        "history_compression"
    }

    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        self.config.enabled
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        let dropped = self.dropped_indices(ctx.messages());
        let summary = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        if dropped.is_empty() && summary.is_none() {
            return Ok(ctx);
        }

        let mut kept: Vec<Arc<Message>> = ctx
            .take_messages()
            .into_iter()
            .enumerate()
            .filter(|(index, _)| dropped.binary_search(index).is_err())
            .map(|(_, message)| message)
            .collect();

        if let Some(summary) = summary {
            let leading_system = kept.iter().take_while(|m| m.role == Role::System).count();
            let mut message = Message::system(create_context_block("chat_history_summary", summary));
            message.id = None;
            kept.insert(leading_system, Arc::new(message));
            ctx.set_metadata(HISTORY_SUMMARY_INJECTED, true);
        }

        ctx.set_messages(kept);
        if !dropped.is_empty() {
            tracing::debug!(
                dropped = dropped.len(),
                kept = ctx.len(),
                "[HistoryCompressionProcessor] compressed history"
            );
            ctx.set_metadata(HISTORY_COMPRESSED, dropped.len());
        }

        Ok(ctx)
    }
}
