//! Reaction Feedback Processor
//!
//! This processor turns emoji reactions on assistant messages into inline
//! feedback the model can read.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::ProcessError;
use crate::pipeline::traits::Processor;
use crate::structs::message::{Message, MessageContent, REACTIONS_KEY, Role};
use crate::structs::reaction::{EmojiReaction, sentiment_phrase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key holding the number of annotated messages.
pub const REACTION_FEEDBACK_PROCESSED: &str = "reactionFeedbackProcessed";

/// Reaction Feedback Processor
///
/// For each assistant message with plain-text content and at least one
/// reaction, appends `[User Feedback: ...]` listing one sentiment phrase per
/// reaction. Structured content is left untouched.
///
/// # Example
///
/// ```no_run
/// use context_engine::pipeline::processors::ReactionFeedbackProcessor;
/// use context_engine::pipeline::ContextPipeline;
///
/// let pipeline = ContextPipeline::new()
///     .register(Box::new(ReactionFeedbackProcessor::new()));
/// ```
pub struct ReactionFeedbackProcessor {
    config: ReactionFeedbackConfig,
}

/// Reaction Feedback Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionFeedbackConfig {
    /// When false the processor is a passthrough
    pub enabled: bool,
}

impl Default for ReactionFeedbackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ReactionFeedbackProcessor {
    /// Create a new reaction feedback processor with default config
    pub fn new() -> Self {
        Self {
            config: ReactionFeedbackConfig::default(),
        }
    }

    /// Create a reaction feedback processor with custom config
    pub fn with_config(config: ReactionFeedbackConfig) -> Self {
        Self { config }
    }

    fn reactions_of(index: usize, message: &Message) -> Result<Vec<EmojiReaction>, ProcessError> {
        match message.metadata.get(REACTIONS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                ProcessError::malformed(format!("message {index} has invalid reactions: {err}"))
            }),
        }
    }

    fn format_feedback(reactions: &[EmojiReaction]) -> String {
        reactions
            .iter()
            .map(|reaction| sentiment_phrase(&reaction.emoji))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ReactionFeedbackProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for ReactionFeedbackProcessor {
    fn name(&self) -> &str {
        "reaction_feedback"
    }

    fn should_run(&self, _ctx: &PipelineContext) -> bool {
        self.config.enabled
    }

    async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        let mut updates = Vec::new();

        for (index, message) in ctx.messages().iter().enumerate() {
            if message.role != Role::Assistant {
                continue;
            }

            let reactions = Self::reactions_of(index, message)?;
            if reactions.is_empty() {
                continue;
            }

            let MessageContent::Text(text) = &message.content else {
                continue;
            };

            let feedback = Self::format_feedback(&reactions);
            if feedback.is_empty() {
                continue;
            }

            let mut updated = Message::clone(message);
            updated.content = MessageContent::Text(format!("{text}\n\n[User Feedback: {feedback}]"));
            updates.push((index, updated));
        }

        let processed = updates.len();
        for (index, updated) in updates {
            ctx.replace_message(index, updated);
        }

        tracing::debug!("[ReactionFeedbackProcessor] annotated {processed} message(s)");
        ctx.set_metadata(REACTION_FEEDBACK_PROCESSED, processed);

        Ok(ctx)
    }
}
